//! The only write path into a [`FamilyTree`].
//!
//! Each operation validates first, edits a draft copy of the person map, and commits the draft as
//! a new version. An `Err` return means nothing changed.

use crate::error::{MutationError, Result};
use crate::person::{Gender, Person, SpouseLink, full_name};
use crate::tree::{FamilyTree, PersonMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// How a new person relates to the anchor person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// No anchor: the first person of a tree, an import, or an accepted suggestion placed by hand.
    Root,
    Parent,
    Child,
    Sibling,
    Spouse,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Root => "root",
            Relation::Parent => "parent",
            Relation::Child => "child",
            Relation::Sibling => "sibling",
            Relation::Spouse => "spouse",
        }
    }

    fn generation_offset(self) -> i32 {
        match self {
            Relation::Parent => -1,
            Relation::Child => 1,
            Relation::Root | Relation::Sibling | Relation::Spouse => 0,
        }
    }
}

/// Input for [`FamilyTree::add_person`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    /// Explicit id (imports, accepted suggestions). A fresh id is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Only used for [`Relation::Root`]; anchored additions derive the generation.
    #[serde(default)]
    pub generation: i32,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default, rename = "isAIMatched")]
    pub is_ai_matched: bool,
    #[serde(default)]
    pub match_confidence: Option<f64>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub marriage_date: Option<String>,
}

impl NewPerson {
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Field-wise update for [`FamilyTree::edit_person`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub generation: Option<i32>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub achievements: Option<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<Value>>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
    #[serde(default)]
    pub children: Option<Vec<String>>,
    #[serde(default)]
    pub siblings: Option<Vec<String>>,
    #[serde(default)]
    pub spouses: Option<Vec<SpouseLink>>,
    #[serde(default)]
    pub is_editable: Option<bool>,
}

impl FamilyTree {
    /// Adds a person, wiring the relation on both the new record and the anchor.
    ///
    /// Returns the id of the new person.
    pub fn add_person(
        &mut self,
        data: NewPerson,
        anchor: Option<&str>,
        relation: Relation,
    ) -> Result<String> {
        if data.first_name.trim().is_empty() {
            return Err(MutationError::MissingField {
                field: "firstName",
            });
        }

        let anchor = match (relation, anchor) {
            (Relation::Root, _) => None,
            (_, None) => {
                return Err(MutationError::MissingAnchor {
                    relation: relation.as_str(),
                });
            }
            (_, Some(id)) => Some(Arc::clone(self.get(id).ok_or_else(|| {
                MutationError::UnknownPerson { id: id.to_string() }
            })?)),
        };

        let id = match data.id.as_deref().map(str::trim) {
            Some("") | None => self.fresh_id(),
            Some(id) if self.contains(id) => {
                return Err(MutationError::DuplicateId { id: id.to_string() });
            }
            Some(id) => id.to_string(),
        };

        let generation = anchor
            .as_ref()
            .map(|a| a.generation + relation.generation_offset())
            .unwrap_or(data.generation);

        let mut person = Person {
            id: id.clone(),
            name: full_name(&data.first_name, &data.last_name),
            first_name: data.first_name.trim().to_string(),
            last_name: data.last_name.trim().to_string(),
            gender: data.gender,
            generation,
            birth_date: data.birth_date,
            death_date: data.death_date,
            photo: data.photo,
            bio: data.bio,
            is_ai_matched: data.is_ai_matched,
            match_confidence: data.match_confidence,
            created_by: data.created_by,
            is_editable: Some(true),
            ..Default::default()
        };

        let mut draft = self.draft();
        if let Some(anchor) = anchor {
            let anchor_id = anchor.id.clone();
            match relation {
                Relation::Root => {}
                Relation::Parent => {
                    person.children.push(anchor_id.clone());
                    edit(&mut draft, &anchor_id, |a| push_unique(&mut a.parents, &id));
                }
                Relation::Child => {
                    person.parents.push(anchor_id.clone());
                    edit(&mut draft, &anchor_id, |a| push_unique(&mut a.children, &id));
                }
                Relation::Sibling => {
                    person.siblings.push(anchor_id.clone());
                    edit(&mut draft, &anchor_id, |a| push_unique(&mut a.siblings, &id));
                    // A sibling shares the anchor's known parents.
                    let parents: Vec<String> = anchor
                        .parents
                        .iter()
                        .filter(|p| draft.contains_key(p.as_str()))
                        .cloned()
                        .collect();
                    for parent in parents {
                        edit(&mut draft, &parent, |p| push_unique(&mut p.children, &id));
                        person.parents.push(parent);
                    }
                }
                Relation::Spouse => {
                    let link = SpouseLink {
                        id: anchor_id.clone(),
                        marriage_date: data.marriage_date.clone(),
                        divorce_date: None,
                        is_current_spouse: true,
                    };
                    person.spouses.push(link);
                    let back = SpouseLink {
                        id: id.clone(),
                        marriage_date: data.marriage_date,
                        divorce_date: None,
                        is_current_spouse: true,
                    };
                    edit(&mut draft, &anchor_id, |a| {
                        if !a.spouse_ids().any(|s| s == back.id) {
                            a.spouses.push(back);
                        }
                    });
                }
            }
        }

        draft.insert(id.clone(), Arc::new(person));
        self.commit(draft);
        Ok(id)
    }

    /// Removes a person and every reference to them, if `can_delete` allows it.
    pub fn delete_person<F>(&mut self, id: &str, can_delete: F) -> Result<Arc<Person>>
    where
        F: FnOnce(&Person) -> bool,
    {
        let target = self
            .get(id)
            .cloned()
            .ok_or_else(|| MutationError::UnknownPerson { id: id.to_string() })?;
        if !can_delete(&target) {
            return Err(MutationError::PermissionDenied { id: id.to_string() });
        }

        let mut draft = self.draft();
        draft.shift_remove(id);
        for person in draft.values_mut() {
            if person.references_id(id) {
                Arc::make_mut(person).remove_references(id);
            }
        }
        self.commit(draft);
        Ok(target)
    }

    /// Merges `patch` into an existing person and returns the updated record.
    pub fn edit_person(&mut self, id: &str, patch: PersonPatch) -> Result<Arc<Person>> {
        if !self.contains(id) {
            return Err(MutationError::UnknownPerson { id: id.to_string() });
        }
        if patch
            .first_name
            .as_deref()
            .is_some_and(|f| f.trim().is_empty())
        {
            return Err(MutationError::MissingField {
                field: "firstName",
            });
        }

        let mut draft = self.draft();
        edit(&mut draft, id, |p| apply_patch(p, patch));
        let updated = draft
            .get(id)
            .cloned()
            .ok_or_else(|| MutationError::UnknownPerson { id: id.to_string() })?;
        self.commit(draft);
        Ok(updated)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = format!("person_{}", uuid::Uuid::new_v4().simple());
            if !self.contains(&id) {
                return id;
            }
        }
    }
}

fn apply_patch(person: &mut Person, patch: PersonPatch) {
    let renamed = patch.first_name.is_some() || patch.last_name.is_some();
    if let Some(first) = patch.first_name {
        person.first_name = first.trim().to_string();
    }
    if let Some(last) = patch.last_name {
        person.last_name = last.trim().to_string();
    }
    if renamed {
        person.name = full_name(&person.first_name, &person.last_name);
    }

    if let Some(gender) = patch.gender {
        person.gender = Some(gender);
    }
    if let Some(generation) = patch.generation {
        person.generation = generation;
    }
    if let Some(v) = patch.birth_date {
        person.birth_date = Some(v);
    }
    if let Some(v) = patch.death_date {
        person.death_date = Some(v);
    }
    if let Some(v) = patch.photo {
        person.photo = Some(v);
    }
    if let Some(v) = patch.photos {
        person.photos = v;
    }
    if let Some(v) = patch.bio {
        person.bio = Some(v);
    }
    if let Some(v) = patch.achievements {
        person.achievements = v;
    }
    if let Some(v) = patch.documents {
        person.documents = v;
    }
    if let Some(v) = patch.parents {
        person.parents = v;
    }
    if let Some(v) = patch.children {
        person.children = v;
    }
    if let Some(v) = patch.siblings {
        person.siblings = v;
    }
    if let Some(v) = patch.spouses {
        person.spouses = v;
        person.spouse = None;
    }
    if let Some(v) = patch.is_editable {
        person.is_editable = Some(v);
    }

    let diagnostics = person.normalize();
    for d in diagnostics {
        tracing::warn!(person = %d.person, link = %d.link, "{d}");
    }
}

fn edit<F>(draft: &mut PersonMap, id: &str, f: F)
where
    F: FnOnce(&mut Person),
{
    if let Some(person) = draft.get_mut(id) {
        f(Arc::make_mut(person));
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|x| x == id) {
        list.push(id.to_string());
    }
}
