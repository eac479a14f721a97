use crate::person::Person;
use crate::tree::PersonMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Partitions persons into generation rows using each record's asserted `generation`.
///
/// Rows iterate in ascending generation order; members keep map insertion order.
pub fn group_by_generation(persons: &PersonMap) -> BTreeMap<i32, Vec<&Arc<Person>>> {
    group_by_generation_with(persons, |p| p.generation)
}

/// Like [`group_by_generation`], with the row of each person chosen by `generation_of`.
pub fn group_by_generation_with<F>(
    persons: &PersonMap,
    mut generation_of: F,
) -> BTreeMap<i32, Vec<&Arc<Person>>>
where
    F: FnMut(&Person) -> i32,
{
    let mut rows: BTreeMap<i32, Vec<&Arc<Person>>> = BTreeMap::new();
    for person in persons.values() {
        rows.entry(generation_of(person)).or_default().push(person);
    }
    rows
}
