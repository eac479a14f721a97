use crate::diagnostic::{Diagnostic, DiagnosticKind, LinkKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// One entry of a person's `spouses` list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpouseLink {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marriage_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divorce_date: Option<String>,
    #[serde(default)]
    pub is_current_spouse: bool,
}

impl SpouseLink {
    pub fn current(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            marriage_date: None,
            divorce_date: None,
            is_current_spouse: true,
        }
    }
}

/// The legacy single `spouse` field. Older records store a bare id, newer ones a full link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacySpouse {
    Id(String),
    Link(SpouseLink),
}

impl LegacySpouse {
    pub fn id(&self) -> &str {
        match self {
            LegacySpouse::Id(id) => id,
            LegacySpouse::Link(link) => &link.id,
        }
    }

    pub fn into_link(self) -> SpouseLink {
        match self {
            // A bare legacy id carries no history, so it is read as the current spouse.
            LegacySpouse::Id(id) => SpouseLink::current(id),
            LegacySpouse::Link(link) => link,
        }
    }
}

/// One individual in a family tree.
///
/// Only `id`, `generation` and the relation lists matter to layout; the remaining fields are
/// carried for collaborators and preserved through export/import. Unknown JSON keys are kept in
/// [`Person::extra`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub generation: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse: Option<LegacySpouse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spouses: Vec<SpouseLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub achievements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Value>,

    #[serde(default)]
    pub is_current_user: bool,
    #[serde(default, rename = "isAIMatched")]
    pub is_ai_matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        generation: i32,
    ) -> Self {
        let first_name = first_name.into();
        let last_name = last_name.into();
        Self {
            id: id.into(),
            name: full_name(&first_name, &last_name),
            first_name,
            last_name,
            generation,
            ..Default::default()
        }
    }

    pub fn has_photo(&self) -> bool {
        self.photo.as_deref().is_some_and(|p| !p.trim().is_empty()) || !self.photos.is_empty()
    }

    /// Spouse candidates from both `spouses` and the legacy `spouse` field, deduplicated by id.
    /// `spouses` entries win over a legacy entry with the same id.
    pub fn spouse_links(&self) -> Vec<SpouseLink> {
        let mut out: Vec<SpouseLink> = Vec::with_capacity(self.spouses.len() + 1);
        for link in &self.spouses {
            if !out.iter().any(|l| l.id == link.id) {
                out.push(link.clone());
            }
        }
        if let Some(legacy) = &self.spouse {
            if !out.iter().any(|l| l.id == legacy.id()) {
                out.push(legacy.clone().into_link());
            }
        }
        out
    }

    pub fn spouse_ids(&self) -> impl Iterator<Item = &str> {
        self.spouses
            .iter()
            .map(|l| l.id.as_str())
            .chain(self.spouse.as_ref().map(LegacySpouse::id))
    }

    /// Every `(kind, id)` reference this record declares.
    pub fn references(&self) -> impl Iterator<Item = (LinkKind, &str)> {
        self.parents
            .iter()
            .map(|id| (LinkKind::Parent, id.as_str()))
            .chain(self.children.iter().map(|id| (LinkKind::Child, id.as_str())))
            .chain(self.siblings.iter().map(|id| (LinkKind::Sibling, id.as_str())))
            .chain(self.spouse_ids().map(|id| (LinkKind::Spouse, id)))
    }

    pub fn references_id(&self, id: &str) -> bool {
        self.references().any(|(_, other)| other == id)
    }

    /// Drops every reference to `id`. Returns whether anything was removed.
    pub fn remove_references(&mut self, id: &str) -> bool {
        let before = self.parents.len()
            + self.children.len()
            + self.siblings.len()
            + self.spouses.len()
            + usize::from(self.spouse.is_some());
        self.parents.retain(|p| p != id);
        self.children.retain(|c| c != id);
        self.siblings.retain(|s| s != id);
        self.spouses.retain(|s| s.id != id);
        if self.spouse.as_ref().is_some_and(|s| s.id() == id) {
            self.spouse = None;
        }
        let after = self.parents.len()
            + self.children.len()
            + self.siblings.len()
            + self.spouses.len()
            + usize::from(self.spouse.is_some());
        after != before
    }

    /// Canonicalizes the record in place:
    /// - the legacy `spouse` field is folded into `spouses`
    /// - self references are removed (reported)
    /// - repeated ids inside one list are collapsed
    pub fn normalize(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Some(legacy) = self.spouse.take() {
            if !self.spouses.iter().any(|l| l.id == legacy.id()) {
                self.spouses.push(legacy.into_link());
            }
        }

        let id = self.id.clone();
        for (kind, list) in [
            (LinkKind::Parent, &mut self.parents),
            (LinkKind::Child, &mut self.children),
            (LinkKind::Sibling, &mut self.siblings),
        ] {
            if list.iter().any(|other| *other == id) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SelfReference,
                    &id,
                    &id,
                    kind,
                ));
            }
            let mut seen = rustc_hash::FxHashSet::default();
            list.retain(|other| *other != id && seen.insert(other.clone()));
        }

        if self.spouses.iter().any(|l| l.id == id) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SelfReference,
                &id,
                &id,
                LinkKind::Spouse,
            ));
        }
        let mut seen = rustc_hash::FxHashSet::default();
        self.spouses
            .retain(|l| l.id != id && seen.insert(l.id.clone()));

        diagnostics
    }
}

/// Display name derived from first and last name.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    match (first_name.trim(), last_name.trim()) {
        ("", last) => last.to_string(),
        (first, "") => first.to_string(),
        (first, last) => format!("{first} {last}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_mobile_record_shape() {
        let p: Person = serde_json::from_value(json!({
            "id": "p1",
            "name": "Ada Lovelace",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "gender": "female",
            "generation": 1,
            "parents": ["p0"],
            "spouse": "p2",
            "spouses": [{ "id": "p2", "marriageDate": "1835-07-08", "isCurrentSpouse": true }],
            "isAIMatched": true,
            "matchConfidence": 0.82,
            "favouriteColour": "green"
        }))
        .unwrap();

        assert_eq!(p.gender, Some(Gender::Female));
        assert!(p.is_ai_matched);
        assert_eq!(p.spouse, Some(LegacySpouse::Id("p2".to_string())));
        assert_eq!(p.extra.get("favouriteColour"), Some(&json!("green")));

        let links = p.spouse_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].marriage_date.as_deref(), Some("1835-07-08"));
    }

    #[test]
    fn normalize_folds_legacy_spouse_and_strips_self_references() {
        let mut p = Person::new("x", "X", "", 0);
        p.spouse = Some(LegacySpouse::Id("y".to_string()));
        p.siblings = vec!["x".to_string(), "z".to_string(), "z".to_string()];

        let diagnostics = p.normalize();

        assert_eq!(p.spouse, None);
        assert_eq!(p.spouses, vec![SpouseLink::current("y")]);
        assert_eq!(p.siblings, vec!["z".to_string()]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::SelfReference);
        assert_eq!(diagnostics[0].link, LinkKind::Sibling);
    }

    #[test]
    fn remove_references_covers_every_list() {
        let mut p = Person::new("a", "A", "", 0);
        p.parents.push("ghost".into());
        p.children.push("ghost".into());
        p.spouse = Some(LegacySpouse::Id("ghost".into()));
        p.spouses.push(SpouseLink::current("ghost"));
        p.siblings.push("b".into());

        assert!(p.remove_references("ghost"));
        assert!(!p.references_id("ghost"));
        assert_eq!(p.siblings, vec!["b".to_string()]);
        assert!(!p.remove_references("ghost"));
    }

    #[test]
    fn full_name_skips_empty_halves() {
        assert_eq!(full_name("Ada", "Lovelace"), "Ada Lovelace");
        assert_eq!(full_name("Ada", " "), "Ada");
        assert_eq!(full_name("", "Lovelace"), "Lovelace");
    }
}
