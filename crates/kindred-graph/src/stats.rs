use crate::tree::PersonMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Summary counters for tree headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub total_members: usize,
    /// Number of distinct generation values.
    pub generations: usize,
    pub with_photos: usize,
    pub ai_matched: usize,
}

pub fn stats(persons: &PersonMap) -> TreeStats {
    let mut generations: FxHashSet<i32> = FxHashSet::default();
    let mut out = TreeStats {
        total_members: persons.len(),
        ..Default::default()
    };
    for person in persons.values() {
        generations.insert(person.generation);
        if person.has_photo() {
            out.with_photos += 1;
        }
        if person.is_ai_matched {
            out.ai_matched += 1;
        }
    }
    out.generations = generations.len();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::Person;
    use std::sync::Arc;

    #[test]
    fn counts_members_generations_photos_and_matches() {
        let mut a = Person::new("a", "A", "", 0);
        a.photo = Some("file://a.jpg".into());
        let mut b = Person::new("b", "B", "", 1);
        b.is_ai_matched = true;
        b.photos = vec!["file://b.jpg".into()];
        let mut c = Person::new("c", "C", "", 1);
        c.photo = Some("  ".into());

        let map: PersonMap = [a, b, c]
            .into_iter()
            .map(|p| (p.id.clone(), Arc::new(p)))
            .collect();

        assert_eq!(
            stats(&map),
            TreeStats {
                total_members: 3,
                generations: 2,
                with_photos: 2,
                ai_matched: 1,
            }
        );
    }
}
