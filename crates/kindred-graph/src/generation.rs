//! Generation hardening helpers.
//!
//! Layout trusts the asserted `generation` field by default. These helpers let a caller derive
//! generations from the relation graph instead, or list the records where the asserted values
//! contradict a parent/child link.

use crate::tree::PersonMap;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Generation per person id, in map order.
///
/// Breadth-first propagation starts from every person whose asserted generation is `0`: a
/// parent is one row up, a child one row down, spouses and siblings share the row. Persons not
/// reachable from any such anchor keep their asserted value. Dangling references are skipped.
pub fn derive_generations(persons: &PersonMap) -> IndexMap<String, i32> {
    let mut assigned: IndexMap<String, i32> = IndexMap::with_capacity(persons.len());
    let mut queue: VecDeque<(&str, i32)> = VecDeque::new();

    for person in persons.values().filter(|p| p.generation == 0) {
        assigned.insert(person.id.clone(), 0);
        queue.push_back((person.id.as_str(), 0));
    }

    while let Some((id, generation)) = queue.pop_front() {
        let Some(person) = persons.get(id) else {
            continue;
        };
        let neighbours = person
            .parents
            .iter()
            .map(|p| (p.as_str(), generation - 1))
            .chain(person.children.iter().map(|c| (c.as_str(), generation + 1)))
            .chain(person.siblings.iter().map(|s| (s.as_str(), generation)))
            .chain(person.spouse_ids().map(|s| (s, generation)));

        for (other, other_generation) in neighbours {
            let Some((key, _)) = persons.get_key_value(other) else {
                continue;
            };
            if assigned.contains_key(other) {
                continue;
            }
            assigned.insert(key.clone(), other_generation);
            queue.push_back((key.as_str(), other_generation));
        }
    }

    persons
        .values()
        .map(|p| {
            let g = assigned.get(&p.id).copied().unwrap_or(p.generation);
            (p.id.clone(), g)
        })
        .collect()
}

/// A parent/child pair whose asserted generations are not strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConflict {
    pub parent: String,
    pub child: String,
    pub parent_generation: i32,
    pub child_generation: i32,
}

pub fn generation_conflicts(persons: &PersonMap) -> Vec<GenerationConflict> {
    let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
    let mut out = Vec::new();

    let declared = persons.values().flat_map(|p| {
        p.children
            .iter()
            .map(move |c| (p.id.as_str(), c.as_str()))
            .chain(p.parents.iter().map(move |parent| (parent.as_str(), p.id.as_str())))
    });

    for (parent_id, child_id) in declared {
        let (Some(parent), Some(child)) = (persons.get(parent_id), persons.get(child_id)) else {
            continue;
        };
        if parent.generation < child.generation || !seen.insert((parent_id, child_id)) {
            continue;
        }
        out.push(GenerationConflict {
            parent: parent.id.clone(),
            child: child.id.clone(),
            parent_generation: parent.generation,
            child_generation: child.generation,
        });
    }
    out
}
