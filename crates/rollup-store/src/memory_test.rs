use super::*;
use rollup_core::LineItemId;

fn tables() -> RecordTables {
    let json = r#"{
        "estimates": [
            {"id": "e1", "project": "p1"},
            {"id": "e2", "project": "p1", "deleted_at": "2024-10-01 14:29:19.695+00"}
        ],
        "line_items": [
            {"id": "a", "estimate": "e1", "product": "prod"},
            {"id": "b", "estimate": "e1"},
            {"id": "c", "estimate": "e2"}
        ],
        "products": [{"id": "prod"}, {"id": "unused"}]
    }"#;
    RecordTables::parse(json, false, "inline").unwrap()
}

#[tokio::test]
async fn test_lookup_by_estimate() {
    let store = MemoryStore::from_tables(tables()).unwrap();
    let items = store.line_items(&EstimateId::new("e1")).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(store
        .line_items(&EstimateId::new("missing"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deleted_estimate_hidden() {
    let store = MemoryStore::from_tables(tables()).unwrap();
    assert!(store.estimate(&EstimateId::new("e2")).await.unwrap().is_none());
    assert_eq!(store.estimate_ids(), vec![EstimateId::new("e1")]);
}

#[tokio::test]
async fn test_products_skip_unknown() {
    let store = MemoryStore::from_tables(tables()).unwrap();
    let products = store
        .products(&[ProductId::new("prod"), ProductId::new("ghost")])
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
}

#[test]
fn test_duplicate_estimate_rejected() {
    let mut t = tables();
    t.estimates.push(t.estimates[0].clone());
    let err = MemoryStore::from_tables(t).unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateRecord {
            table: "estimate",
            ..
        }
    ));
}

#[test]
fn test_parse_error_names_path() {
    let err = RecordTables::parse("{not json", false, "broken.json").unwrap_err();
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn test_parse_yaml_tables() {
    let yaml = r#"
estimates:
  - id: e1
    project: p1
line_items:
  - id: a
    estimate: e1
    quantity: 3
"#;
    let t = RecordTables::parse(yaml, true, "inline.yml").unwrap();
    assert_eq!(t.line_items[0].id, LineItemId::new("a"));
    assert_eq!(t.line_items[0].quantity, Some(3.0));
}
