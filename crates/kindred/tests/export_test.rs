use chrono::{DateTime, TimeZone, Utc};
use futures::executor::block_on;
use kindred::{
    EngineConfig, Error, FamilyTree, Gender, LayoutView, MemoryStore, Person, Point,
    RepositionNode, SpouseLink, TreeExport, TreeSession,
};
use serde_json::json;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn family() -> FamilyTree {
    let mut a = Person::new("A", "Ada", "Moss", 0);
    a.gender = Some(Gender::Female);
    a.children = vec!["B".into()];
    a.spouses = vec![SpouseLink {
        id: "W".into(),
        marriage_date: Some("1970-06-01".into()),
        divorce_date: None,
        is_current_spouse: true,
    }];
    a.achievements = vec!["Founded the village library".into()];
    a.extra.insert("nickname".into(), json!("Addie"));
    let mut w = Person::new("W", "Walt", "Moss", 0);
    w.spouses = vec![SpouseLink::current("A")];
    w.children = vec!["B".into()];
    let mut b = Person::new("B", "Ben", "Moss", 1);
    b.parents = vec!["A".into(), "W".into()];
    b.photo = Some("https://example.invalid/ben.jpg".into());
    b.is_ai_matched = true;
    b.match_confidence = Some(0.82);
    FamilyTree::from_persons("tree-1", [a, w, b])
}

fn dragged_session(store: &MemoryStore) -> TreeSession<&MemoryStore> {
    let mut session = TreeSession::new(family(), store, EngineConfig::default());
    block_on(session.refresh(t0())).unwrap();
    session
        .reposition(&RepositionNode::new("B", 1050.0, 250.0), t0())
        .unwrap();
    session
}

#[test]
fn json_export_inlines_position_next_to_person_fields() {
    let store = MemoryStore::new();
    let session = dragged_session(&store);
    let export = session.export(t0());

    let value: serde_json::Value = serde_json::from_str(&export.to_json(false).unwrap()).unwrap();
    assert_eq!(value["treeId"], "tree-1");
    assert_eq!(value["version"], 1);
    let b = value["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "B")
        .unwrap();
    assert_eq!(b["firstName"], "Ben");
    assert_eq!(b["isAIMatched"], true);
    assert_eq!(b["position"]["x"], 1050.0);
    assert_eq!(b["position"]["y"], 250.0);

    let a = value["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "A")
        .unwrap();
    assert_eq!(a["nickname"], "Addie");
}

#[test]
fn json_import_restores_people_and_positions() {
    let store = MemoryStore::new();
    let export = dragged_session(&store).export(t0());
    let text = export.to_json(true).unwrap();

    let parsed = TreeExport::from_json(&text).unwrap();
    assert_eq!(parsed, export);

    let target = MemoryStore::new();
    let restored =
        block_on(TreeSession::restore(parsed, &target, EngineConfig::default(), t0())).unwrap();
    let LayoutView::Ready(layout) = restored.view() else {
        panic!("expected a ready layout");
    };
    let b = layout.node("B").unwrap();
    assert_eq!((b.x, b.y), (1050.0, 250.0));
    assert_eq!(
        restored.tree().get("A").unwrap().extra.get("nickname"),
        Some(&json!("Addie"))
    );
    assert!(target.raw("family_tree_layout_tree-1").is_some());
}

#[test]
fn csv_export_flattens_lists_and_structured_fields() {
    let store = MemoryStore::new();
    let csv = dragged_session(&store).export(t0()).to_csv().unwrap();

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);

    let b = rows.iter().find(|r| &r[column("id")] == "B").unwrap();
    assert_eq!(&b[column("parents")], "A;W");
    assert_eq!(&b[column("x")], "1050.0");
    assert_eq!(&b[column("isAIMatched")], "true");

    let a = rows.iter().find(|r| &r[column("id")] == "A").unwrap();
    assert_eq!(&a[column("gender")], "female");
    let spouses: Vec<SpouseLink> = serde_json::from_str(&a[column("spouses")]).unwrap();
    assert_eq!(spouses[0].marriage_date.as_deref(), Some("1970-06-01"));
    assert!(a[column("extra")].contains("Addie"));
}

#[test]
fn csv_import_rebuilds_an_equivalent_tree() {
    let store = MemoryStore::new();
    let export = dragged_session(&store).export(t0());
    let csv = export.to_csv().unwrap();

    let parsed = TreeExport::from_csv("tree-1", &csv, t0()).unwrap();
    assert_eq!(parsed.records.len(), 3);
    for (got, want) in parsed.records.iter().zip(&export.records) {
        assert_eq!(got.person, want.person);
    }
    assert_eq!(parsed.positions(), export.positions());
    assert!(
        parsed
            .positions()
            .contains(&("B".to_string(), Point::new(1050.0, 250.0)))
    );
}

#[test]
fn csv_rejects_ids_containing_the_list_separator() {
    let mut a = Person::new("A", "Ada", "", 0);
    a.children = vec!["B;1".into()];
    let tree = FamilyTree::from_persons("tree-1", [a, Person::new("B;1", "Ben", "", 1)]);

    let err = TreeExport::from_tree(&tree, None, t0()).to_csv().unwrap_err();
    assert!(matches!(err, Error::Tabular { .. }));
}

#[test]
fn csv_row_with_half_a_position_is_rejected() {
    let store = MemoryStore::new();
    let csv = dragged_session(&store).export(t0()).to_csv().unwrap();
    let broken = csv.replacen("1050.0", "", 1);

    let err = TreeExport::from_csv("tree-1", &broken, t0()).unwrap_err();
    assert!(matches!(err, Error::Tabular { .. }));
}

#[test]
fn export_without_layout_has_no_positions() {
    let export = TreeExport::from_tree(&family(), None, t0());
    assert!(export.positions().is_empty());
    assert_eq!(export.records.len(), 3);
}
