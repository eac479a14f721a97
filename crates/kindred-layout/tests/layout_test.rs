use kindred_graph::{DiagnosticKind, FamilyTree, LegacySpouse, Person, SpouseLink};
use kindred_layout::{
    ConnectionKey, ConnectionKind, Error, LayoutConfig, apply_positions, compute_layout,
};
use rustc_hash::FxHashSet;

fn tree(persons: Vec<Person>) -> FamilyTree {
    FamilyTree::from_persons("test", persons)
}

fn parent_keys(tree: &FamilyTree) -> Vec<String> {
    let layout = compute_layout(tree.persons(), &LayoutConfig::default()).expect("layout ok");
    let mut keys: Vec<String> = layout
        .connections
        .iter()
        .filter(|c| c.kind == ConnectionKind::Parent)
        .map(|c| c.key().to_string())
        .collect();
    keys.sort();
    keys
}

#[test]
fn basic_tree_has_one_row_per_generation_and_two_parent_edges() {
    let mut a = Person::new("A", "A", "", 0);
    a.children = vec!["B".into()];
    let mut b = Person::new("B", "B", "", 1);
    b.parents = vec!["A".into()];
    b.children = vec!["C".into()];
    let mut c = Person::new("C", "C", "", 2);
    c.parents = vec!["B".into()];
    let tree = tree(vec![a, b, c]);

    let layout = compute_layout(tree.persons(), &LayoutConfig::default()).unwrap();
    assert_eq!(layout.nodes.len(), 3);
    let rows: FxHashSet<i32> = layout.nodes.iter().map(|n| n.generation).collect();
    assert_eq!(rows.len(), 3);

    let ys: Vec<f64> = ["A", "B", "C"]
        .iter()
        .map(|id| layout.node(id).unwrap().y)
        .collect();
    assert!(ys[0] < ys[1] && ys[1] < ys[2]);

    assert_eq!(parent_keys(&tree), vec!["parent:A:B", "parent:B:C"]);
    assert!(layout.diagnostics.is_empty());
}

#[test]
fn redundant_declaration_yields_a_single_parent_edge() {
    let mut a = Person::new("A", "A", "", 0);
    a.children = vec!["B".into()];
    let mut b = Person::new("B", "B", "", 1);
    b.parents = vec!["A".into()];

    assert_eq!(parent_keys(&tree(vec![a, b])), vec!["parent:A:B"]);
}

#[test]
fn legacy_and_list_spouse_merge_into_one_edge() {
    let mut x = Person::new("X", "X", "", 0);
    x.spouse = Some(LegacySpouse::Id("Y".into()));
    x.spouses = vec![SpouseLink::current("Y")];
    let mut y = Person::new("Y", "Y", "", 0);
    y.spouses = vec![SpouseLink::current("X")];

    // Raw records, without the load-time normalization.
    let persons = [x, y]
        .into_iter()
        .map(|p| (p.id.clone(), std::sync::Arc::new(p)))
        .collect();
    let layout = compute_layout(&persons, &LayoutConfig::default()).unwrap();

    let spouses: Vec<_> = layout
        .connections
        .iter()
        .filter(|c| c.kind == ConnectionKind::Spouse)
        .collect();
    assert_eq!(spouses.len(), 1);
    assert_eq!(
        spouses[0].key(),
        ConnectionKey::new(ConnectionKind::Spouse, "X", "Y")
    );
    assert!(spouses[0].marriage_info.is_some());
}

#[test]
fn dangling_reference_keeps_node_and_drops_edge() {
    let mut d = Person::new("D", "D", "", 1);
    d.parents = vec!["ghost".into()];
    let layout = compute_layout(tree(vec![d]).persons(), &LayoutConfig::default()).unwrap();

    assert_eq!(layout.nodes.len(), 1);
    assert_eq!(layout.nodes[0].id, "D");
    assert!(
        layout
            .connections
            .iter()
            .all(|c| c.from != "ghost" && c.to != "ghost")
    );
    assert_eq!(layout.diagnostics.len(), 1);
    assert_eq!(layout.diagnostics[0].kind, DiagnosticKind::DanglingReference);
    assert_eq!(layout.diagnostics[0].other, "ghost");
}

#[test]
fn siblings_connect_within_a_generation_only() {
    let mut a = Person::new("a", "A", "", 1);
    a.siblings = vec!["b".into(), "c".into()];
    let mut b = Person::new("b", "B", "", 1);
    b.siblings = vec!["a".into()];
    let c = Person::new("c", "C", "", 2);

    let layout =
        compute_layout(tree(vec![a, b, c]).persons(), &LayoutConfig::default()).unwrap();
    let siblings: Vec<String> = layout
        .connections
        .iter()
        .filter(|c| c.kind == ConnectionKind::Sibling)
        .map(|c| c.key().to_string())
        .collect();
    assert_eq!(siblings, vec!["sibling:a:b"]);
    assert!(
        layout
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::SiblingGenerationMismatch)
    );
}

#[test]
fn too_many_nodes_is_reported_not_laid_out() {
    let persons: Vec<Person> = (0..6)
        .map(|i| Person::new(format!("p{i}"), "P", "", 0))
        .collect();
    let cfg = LayoutConfig {
        max_nodes: 5,
        ..Default::default()
    };
    let err = compute_layout(tree(persons).persons(), &cfg).unwrap_err();
    assert_eq!(err, Error::TooManyNodes { count: 6, cap: 5 });
}

#[test]
fn layout_serializes_in_collaborator_shape() {
    let mut a = Person::new("A", "A", "", 0);
    a.children = vec!["B".into()];
    let layout = compute_layout(
        tree(vec![a, Person::new("B", "B", "", 1)]).persons(),
        &LayoutConfig::default(),
    )
    .unwrap();

    let v = serde_json::to_value(&layout).unwrap();
    assert_eq!(v["nodes"][0]["id"], "A");
    assert_eq!(v["nodes"][0]["person"]["firstName"], "A");
    assert_eq!(v["connections"][0]["type"], "parent");
    assert!(v.get("diagnostics").is_none());
}

#[test]
fn apply_positions_reanchors_connections() {
    let cfg = LayoutConfig::default();
    let mut a = Person::new("A", "A", "", 0);
    a.children = vec!["B".into()];
    let layout =
        compute_layout(tree(vec![a, Person::new("B", "B", "", 1)]).persons(), &cfg).unwrap();

    let moved = apply_positions(
        &layout,
        [("A", kindred_layout::Point::new(300.0, 300.0)), ("nobody", kindred_layout::Point::new(0.0, 0.0))],
        &cfg,
    );
    let c = &moved.connections[0];
    assert_eq!((c.from_x, c.from_y), (300.0, 340.0));
    assert_eq!(moved.nodes.len(), 2);
}

#[test]
fn bounds_cover_node_rectangles() {
    let cfg = LayoutConfig {
        jitter: 0.0,
        ..Default::default()
    };
    let layout = compute_layout(tree(vec![Person::new("solo", "S", "", 0)]).persons(), &cfg)
        .unwrap();
    let b = layout.bounds(cfg.node_width, cfg.node_height).unwrap();
    assert_eq!((b.min_x, b.max_x), (540.0, 660.0));
    assert_eq!((b.min_y, b.max_y), (80.0, 160.0));
}
