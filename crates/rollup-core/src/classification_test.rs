use super::*;

#[test]
fn test_codes_from_export_shape() {
    let codes: ClassificationCodes =
        serde_json::from_str(r#"{"mf1": "03 00 00", "mf2": "03 30 00", "mf3": "03 30 10"}"#)
            .unwrap();
    assert_eq!(codes.get(1), Some("03 00 00"));
    assert_eq!(codes.get(3), Some("03 30 10"));
    assert_eq!(codes.deepest(), Some((3, "03 30 10")));
}

#[test]
fn test_codes_null_and_empty() {
    let codes: ClassificationCodes = serde_json::from_str("null").unwrap();
    assert!(codes.is_empty());

    let codes: ClassificationCodes = serde_json::from_str(r#"{"uf1": "A", "uf2": null}"#).unwrap();
    assert_eq!(codes.iter().count(), 1);
}

#[test]
fn test_codes_reject_key_without_level() {
    let result = serde_json::from_str::<ClassificationCodes>(r#"{"mf": "03"}"#);
    assert!(result.is_err());
}

#[test]
fn test_codes_serialize_by_level() {
    let codes = ClassificationCodes::from_levels([(2u8, "A10"), (1u8, "A")]);
    let json = serde_json::to_string(&codes).unwrap();
    assert_eq!(json, r#"{"1":"A","2":"A10"}"#);
    let back: ClassificationCodes = serde_json::from_str(&json).unwrap();
    assert_eq!(back, codes);
}

#[test]
fn test_lookup_from_hierarchy() {
    let yaml = r#"
mf:
  - code: "03 00 00"
    description: Concrete
    children:
      - code: "03 30 00"
        description: Cast-in-Place Concrete
uf:
  - code: "A"
    description: Substructure
"#;
    let lookup = StaticClassificationLookup::from_yaml_str(yaml).unwrap();
    assert_eq!(lookup.len(), 3);
    assert_eq!(
        lookup.describe(ClassificationScheme::Mf, "03 30 00"),
        Some("Cast-in-Place Concrete".to_string())
    );
    assert_eq!(lookup.describe(ClassificationScheme::Uf, "03 30 00"), None);
}

#[test]
fn test_lookup_load_missing_file() {
    let result = StaticClassificationLookup::load(Path::new("/nonexistent/codes.yml"));
    assert!(matches!(result, Err(CoreError::IoWithPath { .. })));
}
