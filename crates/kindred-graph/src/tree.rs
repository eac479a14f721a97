use crate::diagnostic::{Diagnostic, DiagnosticKind, LinkKind};
use crate::person::Person;
use indexmap::IndexMap;
use std::sync::Arc;

/// All persons of one tree, in insertion order.
pub type PersonMap = IndexMap<String, Arc<Person>>;

/// An immutable view of a tree at one version.
///
/// Cloning is cheap; readers holding a snapshot are unaffected by later mutations.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub tree_id: Arc<str>,
    pub version: u64,
    pub persons: Arc<PersonMap>,
}

impl TreeSnapshot {
    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }
}

/// The owned person store of one family tree.
///
/// The map is replaced wholesale on every successful mutation and the version is bumped, so a
/// snapshot taken before a mutation keeps observing the old data.
#[derive(Debug, Clone)]
pub struct FamilyTree {
    id: Arc<str>,
    version: u64,
    persons: Arc<PersonMap>,
    load_diagnostics: Vec<Diagnostic>,
}

impl FamilyTree {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            persons: Arc::new(PersonMap::default()),
            load_diagnostics: Vec::new(),
        }
    }

    /// Builds a tree from raw records, normalizing each one.
    ///
    /// Duplicate ids keep the first record. Problems found on the way are available from
    /// [`FamilyTree::load_diagnostics`].
    pub fn from_persons(id: impl Into<Arc<str>>, persons: impl IntoIterator<Item = Person>) -> Self {
        let mut map = PersonMap::default();
        let mut diagnostics = Vec::new();
        for mut person in persons {
            if map.contains_key(&person.id) {
                tracing::warn!(id = %person.id, "dropping duplicate person record");
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicatePerson,
                    &person.id,
                    &person.id,
                    LinkKind::Sibling,
                ));
                continue;
            }
            for d in person.normalize() {
                tracing::warn!(person = %d.person, link = %d.link, "{d}");
                diagnostics.push(d);
            }
            map.insert(person.id.clone(), Arc::new(person));
        }

        Self {
            id: id.into(),
            version: 0,
            persons: Arc::new(map),
            load_diagnostics: diagnostics,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn persons(&self) -> &PersonMap {
        &self.persons
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Person>> {
        self.persons.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.persons.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn load_diagnostics(&self) -> &[Diagnostic] {
        &self.load_diagnostics
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            tree_id: Arc::clone(&self.id),
            version: self.version,
            persons: Arc::clone(&self.persons),
        }
    }

    /// Working copy of the map for a mutation. Person records stay shared until touched.
    pub(crate) fn draft(&self) -> PersonMap {
        PersonMap::clone(&self.persons)
    }

    pub(crate) fn commit(&mut self, persons: PersonMap) {
        self.persons = Arc::new(persons);
        self.version += 1;
    }
}
