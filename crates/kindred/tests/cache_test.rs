use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::executor::block_on;
use kindred::{
    CacheLookup, DEFAULT_CACHE_KEY_PREFIX, DiagnosticKind, Error, FamilyTree, LayoutCache,
    LayoutConfig, MemoryStore, MissReason, NewPerson, Person, Relation, compute_layout,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn family() -> FamilyTree {
    let mut a = Person::new("A", "Ada", "Moss", 0);
    a.children = vec!["B".into()];
    let mut b = Person::new("B", "Ben", "Moss", 1);
    b.parents = vec!["A".into()];
    FamilyTree::from_persons("tree-1", [a, b])
}

fn cache(store: &MemoryStore) -> LayoutCache<&MemoryStore> {
    LayoutCache::new(store, Duration::days(7), DEFAULT_CACHE_KEY_PREFIX)
}

#[test]
fn unchanged_tree_within_expiry_is_a_hit() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let tree = family();
    let layout = compute_layout(tree.persons(), &config).unwrap();

    block_on(cache.write("tree-1", &layout, t0())).unwrap();
    assert!(store.raw("family_tree_layout_tree-1").is_some());

    let lookup = block_on(cache.read(
        "tree-1",
        tree.persons(),
        &config,
        t0() + Duration::days(1),
    ));
    let CacheLookup::Hit(hit) = lookup else {
        panic!("expected hit, got {lookup:?}");
    };
    assert_eq!(hit.nodes.len(), 2);
    for node in &hit.nodes {
        let fresh = layout.node(&node.id).unwrap();
        assert!((node.x - fresh.x).abs() < 1e-9);
        assert!((node.y - fresh.y).abs() < 1e-9);
        assert_eq!(node.person.as_ref(), tree.get(&node.id).unwrap().as_ref());
    }
    assert_eq!(hit.connection_keys(), layout.connection_keys());
}

#[test]
fn adding_or_removing_a_person_is_a_miss() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let mut tree = family();
    let layout = compute_layout(tree.persons(), &config).unwrap();
    block_on(cache.write("tree-1", &layout, t0())).unwrap();

    tree.add_person(NewPerson::named("Cy", "Moss"), Some("B"), Relation::Child)
        .unwrap();
    let lookup = block_on(cache.read("tree-1", tree.persons(), &config, t0()));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::MembershipChanged));

    let mut smaller = family();
    smaller.delete_person("B", |_| true).unwrap();
    let lookup = block_on(cache.read("tree-1", smaller.persons(), &config, t0()));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::MembershipChanged));
}

#[test]
fn same_size_but_different_ids_is_a_miss() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let layout = compute_layout(family().persons(), &config).unwrap();
    block_on(cache.write("tree-1", &layout, t0())).unwrap();

    let other = FamilyTree::from_persons(
        "tree-1",
        [Person::new("A", "Ada", "", 0), Person::new("Z", "Zed", "", 1)],
    );
    let lookup = block_on(cache.read("tree-1", other.persons(), &config, t0()));
    assert!(!lookup.is_hit());
}

#[test]
fn entries_older_than_expiry_are_ignored() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let tree = family();
    let layout = compute_layout(tree.persons(), &config).unwrap();
    block_on(cache.write("tree-1", &layout, t0())).unwrap();

    let lookup = block_on(cache.read(
        "tree-1",
        tree.persons(),
        &config,
        t0() + Duration::days(8),
    ));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::Expired));
}

#[test]
fn entries_stamped_in_the_future_are_ignored() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let tree = family();
    let layout = compute_layout(tree.persons(), &config).unwrap();
    block_on(cache.write("tree-1", &layout, t0() + Duration::days(1))).unwrap();

    let lookup = block_on(cache.read("tree-1", tree.persons(), &config, t0()));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::Expired));
}

#[test]
fn hit_reports_the_same_diagnostics_as_a_recompute() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let mut a = Person::new("A", "Ada", "Moss", 0);
    a.siblings = vec!["ghost".into()];
    let tree = FamilyTree::from_persons("tree-1", [a]);
    let layout = compute_layout(tree.persons(), &config).unwrap();
    assert!(!layout.diagnostics.is_empty());
    block_on(cache.write("tree-1", &layout, t0())).unwrap();

    let lookup = block_on(cache.read("tree-1", tree.persons(), &config, t0()));
    let CacheLookup::Hit(hit) = lookup else {
        panic!("expected hit, got {lookup:?}");
    };
    assert_eq!(hit.diagnostics, layout.diagnostics);
    assert!(
        hit.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::DanglingReference && d.other == "ghost")
    );
}

#[test]
fn corrupt_entries_are_purged() {
    let store = MemoryStore::new();
    store.insert_raw("family_tree_layout_tree-1", "{ not json");
    let cache = cache(&store);
    let tree = family();

    let lookup = block_on(cache.read(
        "tree-1",
        tree.persons(),
        &LayoutConfig::default(),
        t0(),
    ));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::Corrupt));
    assert_eq!(store.raw("family_tree_layout_tree-1"), None);
}

#[test]
fn offline_store_degrades_to_miss_and_write_error() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let config = LayoutConfig::default();
    let tree = family();
    let layout = compute_layout(tree.persons(), &config).unwrap();

    store.set_offline(true);
    let lookup = block_on(cache.read("tree-1", tree.persons(), &config, t0()));
    assert_eq!(lookup, CacheLookup::Miss(MissReason::StoreUnavailable));

    let err = block_on(cache.write("tree-1", &layout, t0())).unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(store.is_empty());
}

#[test]
fn invalidate_removes_only_that_tree() {
    let store = MemoryStore::new();
    let cache = cache(&store);
    let layout = compute_layout(family().persons(), &LayoutConfig::default()).unwrap();
    block_on(cache.write("tree-1", &layout, t0())).unwrap();
    block_on(cache.write("tree-2", &layout, t0())).unwrap();

    block_on(cache.invalidate("tree-1")).unwrap();
    assert_eq!(store.raw(&cache.key("tree-1")), None);
    assert!(store.raw(&cache.key("tree-2")).is_some());
}
