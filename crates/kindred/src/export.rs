//! Portable tree snapshots with node positions, as JSON or CSV.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use kindred_graph::{FamilyTree, Gender, Person, SpouseLink};
use kindred_layout::{Layout, Point};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EXPORT_FORMAT_VERSION: u32 = 1;

const LIST_SEPARATOR: &str = ";";
const POSITION_KEY: &str = "position";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeExport {
    pub tree_id: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub records: Vec<ExportRecord>,
}

fn default_version() -> u32 {
    EXPORT_FORMAT_VERSION
}

/// A person record with the position it had in the exported layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(flatten)]
    pub person: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

impl TreeExport {
    pub fn from_tree(tree: &FamilyTree, layout: Option<&Layout>, now: DateTime<Utc>) -> Self {
        let records = tree
            .persons()
            .values()
            .map(|person| {
                let mut person = Person::clone(person);
                person.extra.remove(POSITION_KEY);
                let position = layout
                    .and_then(|l| l.node(&person.id))
                    .map(|n| Point::new(n.x, n.y));
                ExportRecord { person, position }
            })
            .collect();
        Self {
            tree_id: tree.id().to_string(),
            exported_at: now,
            version: EXPORT_FORMAT_VERSION,
            records,
        }
    }

    pub fn positions(&self) -> Vec<(String, Point)> {
        self.records
            .iter()
            .filter_map(|r| r.position.map(|p| (r.person.id.clone(), p)))
            .collect()
    }

    /// Rebuilds the tree. Records go through the same normalization as any load.
    pub fn into_tree(self) -> FamilyTree {
        FamilyTree::from_persons(self.tree_id, self.records.into_iter().map(|r| r.person))
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// One row per person. Id lists are `;`-joined, structured fields are JSON cells.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.records {
            writer.serialize(TabularRow::from_record(record)?)?;
        }
        let bytes = writer.into_inner().map_err(|err| Error::Tabular {
            message: err.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|err| Error::Tabular {
            message: err.to_string(),
        })
    }

    /// Reads rows written by [`TreeExport::to_csv`]. CSV carries no header metadata, so the
    /// tree id and timestamp come from the caller.
    pub fn from_csv(tree_id: impl Into<String>, text: &str, now: DateTime<Utc>) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut records = Vec::new();
        for row in reader.deserialize::<TabularRow>() {
            records.push(row?.into_record()?);
        }
        Ok(Self {
            tree_id: tree_id.into(),
            exported_at: now,
            version: EXPORT_FORMAT_VERSION,
            records,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabularRow {
    id: String,
    name: String,
    first_name: String,
    last_name: String,
    gender: Option<Gender>,
    generation: i32,
    birth_date: Option<String>,
    death_date: Option<String>,
    parents: String,
    children: String,
    siblings: String,
    spouses: String,
    photo: Option<String>,
    photos: String,
    bio: Option<String>,
    achievements: String,
    documents: String,
    is_current_user: bool,
    #[serde(rename = "isAIMatched")]
    is_ai_matched: bool,
    match_confidence: Option<f64>,
    user_id: Option<String>,
    created_by: Option<String>,
    is_editable: Option<bool>,
    extra: String,
    x: Option<f64>,
    y: Option<f64>,
}

impl TabularRow {
    fn from_record(record: &ExportRecord) -> Result<Self> {
        let p = &record.person;
        let spouses: Vec<SpouseLink> = p.spouse_links();
        let mut extra = p.extra.clone();
        extra.remove(POSITION_KEY);
        Ok(Self {
            id: p.id.clone(),
            name: p.name.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            gender: p.gender,
            generation: p.generation,
            birth_date: p.birth_date.clone(),
            death_date: p.death_date.clone(),
            parents: join_ids(&p.id, "parents", &p.parents)?,
            children: join_ids(&p.id, "children", &p.children)?,
            siblings: join_ids(&p.id, "siblings", &p.siblings)?,
            spouses: json_cell(&spouses)?,
            photo: p.photo.clone(),
            photos: json_cell(&p.photos)?,
            bio: p.bio.clone(),
            achievements: json_cell(&p.achievements)?,
            documents: json_cell(&p.documents)?,
            is_current_user: p.is_current_user,
            is_ai_matched: p.is_ai_matched,
            match_confidence: p.match_confidence,
            user_id: p.user_id.clone(),
            created_by: p.created_by.clone(),
            is_editable: p.is_editable,
            extra: if extra.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&extra)?
            },
            x: record.position.map(|pt| pt.x),
            y: record.position.map(|pt| pt.y),
        })
    }

    fn into_record(self) -> Result<ExportRecord> {
        let position = match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            (None, None) => None,
            _ => {
                return Err(Error::Tabular {
                    message: format!("row {} has only one of x/y", self.id),
                });
            }
        };
        let extra: Map<String, Value> = parse_cell(&self.extra)?;
        let person = Person {
            parents: split_ids(&self.parents),
            children: split_ids(&self.children),
            siblings: split_ids(&self.siblings),
            spouses: parse_cell(&self.spouses)?,
            photos: parse_cell(&self.photos)?,
            achievements: parse_cell(&self.achievements)?,
            documents: parse_cell(&self.documents)?,
            id: self.id,
            name: self.name,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender,
            generation: self.generation,
            birth_date: self.birth_date,
            death_date: self.death_date,
            spouse: None,
            photo: self.photo,
            bio: self.bio,
            is_current_user: self.is_current_user,
            is_ai_matched: self.is_ai_matched,
            match_confidence: self.match_confidence,
            user_id: self.user_id,
            created_by: self.created_by,
            is_editable: self.is_editable,
            extra,
        };
        Ok(ExportRecord { person, position })
    }
}

fn join_ids(owner: &str, field: &str, ids: &[String]) -> Result<String> {
    if let Some(bad) = ids.iter().find(|id| id.contains(LIST_SEPARATOR)) {
        return Err(Error::Tabular {
            message: format!("{owner}.{field} contains id {bad:?} with a '{LIST_SEPARATOR}'"),
        });
    }
    Ok(ids.join(LIST_SEPARATOR))
}

fn split_ids(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_cell<T: Serialize>(items: &[T]) -> Result<String> {
    if items.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(items)?)
}

fn parse_cell<T: DeserializeOwned + Default>(cell: &str) -> Result<T> {
    if cell.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(cell)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_split_and_skip_blanks() {
        assert_eq!(split_ids("a; b;;c"), vec!["a", "b", "c"]);
        assert!(split_ids("").is_empty());
    }

    #[test]
    fn separator_inside_an_id_is_rejected() {
        let err = join_ids("p1", "parents", &["a;b".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Tabular { .. }));
        assert!(err.to_string().contains("p1.parents"));
    }

    #[test]
    fn blank_json_cells_read_as_defaults() {
        let photos: Vec<String> = parse_cell("  ").unwrap();
        assert!(photos.is_empty());
        let extra: Map<String, Value> = parse_cell("").unwrap();
        assert!(extra.is_empty());
    }
}
