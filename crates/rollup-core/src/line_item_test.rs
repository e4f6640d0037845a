use super::*;

const EXPORTED: &str = r#"{
    "id": "d437151a-8dbb-4939-a144-9085fd43eadd",
    "estimate": "efbba607-ec30-411a-80a9-6df5aa2d9954",
    "product": "1361b3c7-e5cf-4ecc-af71-b5f4510cc32f",
    "estimate_system": null,
    "quantity": 86,
    "total_cost": 0,
    "deleted_at": null,
    "created_at": "2024-08-26 15:55:55.836+00",
    "name": "Dishwasher",
    "total_uc": 450,
    "labor_uc": 0,
    "material_uc": null,
    "equip_uc": null,
    "uom": "EA",
    "quantity_formula": {},
    "extras": {
        "27bd3b5b-1082-4fd1-8e5c-01a40cb07df6": "52d500a5-d136-4ca5-9e38-a200df3f7504"
    },
    "order": "01000.001",
    "estimate_use_groups": {
        "a7b19fd7-09ba-4c1f-9b3a-65b5c922a4fb": 30,
        "b4hd65ik-h678-75bd-s46g-nch5i8wmd94l": 70
    },
    "parent": null,
    "selected_traditional_assembly": false,
    "alternate": null,
    "product_original": "1361b3c7-e5cf-4ecc-af71-b5f4510cc32f",
    "sub_uc": null,
    "other_uc": null,
    "mf": {"mf1": "03 00 00", "mf2": "03 30 00", "mf3": "03 30 10"},
    "uf": {"uf1": "E", "uf2": "E10", "uf3": "E1060"}
}"#;

#[test]
fn test_parse_exported_line_item() {
    let item: LineItem = serde_json::from_str(EXPORTED).unwrap();
    assert_eq!(item.label(), "Dishwasher");
    assert_eq!(item.quantity, Some(86.0));
    assert!(item.quantity_formula.is_none());
    assert_eq!(item.costs.total_uc, Some(450.0));
    assert_eq!(item.costs.labor_uc, Some(0.0));
    assert_eq!(item.costs.material_uc, None);
    assert_eq!(item.estimate_use_groups.len(), 2);
    assert_eq!(item.extras.len(), 1);
    assert_eq!(item.uf.deepest(), Some((3, "E1060")));
    assert!(!item.is_deleted());
}

#[test]
fn test_parse_formula_and_deleted() {
    let json = r#"{
        "id": "a",
        "estimate": "e",
        "quantity": null,
        "quantity_formula": {"expression": "w * h", "variables": {"w": "b", "h": "c"}},
        "deleted_at": "2024-10-01 14:29:19.695+00"
    }"#;
    let item: LineItem = serde_json::from_str(json).unwrap();
    let formula = item.quantity_formula.as_ref().unwrap();
    assert_eq!(formula.expression, "w * h");
    assert_eq!(formula.references().count(), 2);
    assert!(item.is_deleted());
}

#[test]
fn test_null_maps_default_to_empty() {
    let json = r#"{"id": "a", "estimate": "e", "estimate_use_groups": null, "extras": null,
                   "selected_traditional_assembly": null}"#;
    let item: LineItem = serde_json::from_str(json).unwrap();
    assert!(item.estimate_use_groups.is_empty());
    assert!(item.extras.is_empty());
    assert!(!item.selected_traditional_assembly);
}

#[test]
fn test_label_falls_back_to_id() {
    let item = LineItem::new(LineItemId::new("li-1"), EstimateId::new("e"));
    assert_eq!(item.label(), "li-1");
}
