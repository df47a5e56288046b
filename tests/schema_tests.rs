//! Tests for schema types, parsing, and fingerprints.

use contrail::schema::*;

// ============================================================================
// Schema Type Tests
// ============================================================================

#[test]
fn test_primitive_types() {
    assert!(Schema::Null.is_primitive());
    assert!(Schema::Boolean.is_primitive());
    assert!(Schema::Int.is_primitive());
    assert!(Schema::Long.is_primitive());
    assert!(Schema::Float.is_primitive());
    assert!(Schema::Double.is_primitive());
    assert!(Schema::Bytes.is_primitive());
    assert!(Schema::String.is_primitive());
}

#[test]
fn test_record_schema_construction() {
    let fields = vec![
        FieldSchema::new("id", Schema::Long),
        FieldSchema::new("name", Schema::String),
    ];
    let record = RecordSchema::new("User", fields).with_namespace("com.example");

    assert_eq!(record.name, "User");
    assert_eq!(record.namespace, Some("com.example".to_string()));
    assert_eq!(record.fullname(), "com.example.User");
    assert_eq!(record.fields.len(), 2);
    // Positions follow declaration order
    assert_eq!(record.fields[0].position, 0);
    assert_eq!(record.fields[1].position, 1);
}

#[test]
fn test_nullable_helpers() {
    let schema = parse_schema(r#"["null", "string"]"#).unwrap();
    assert!(schema.is_nullable());
    assert_eq!(schema.nullable_inner(), Some(&Schema::String));

    let schema = parse_schema(r#"["int", "string"]"#).unwrap();
    assert!(!schema.is_nullable());
    assert_eq!(schema.nullable_inner(), None);
}

// ============================================================================
// Parser Tests - Primitive Types
// ============================================================================

#[test]
fn test_parse_primitive_string_schemas() {
    assert_eq!(parse_schema(r#""null""#).unwrap(), Schema::Null);
    assert_eq!(parse_schema(r#""boolean""#).unwrap(), Schema::Boolean);
    assert_eq!(parse_schema(r#""int""#).unwrap(), Schema::Int);
    assert_eq!(parse_schema(r#""long""#).unwrap(), Schema::Long);
    assert_eq!(parse_schema(r#""float""#).unwrap(), Schema::Float);
    assert_eq!(parse_schema(r#""double""#).unwrap(), Schema::Double);
    assert_eq!(parse_schema(r#""bytes""#).unwrap(), Schema::Bytes);
    assert_eq!(parse_schema(r#""string""#).unwrap(), Schema::String);
}

#[test]
fn test_parse_primitive_object_schemas() {
    assert_eq!(parse_schema(r#"{"type": "null"}"#).unwrap(), Schema::Null);
    assert_eq!(parse_schema(r#"{"type": "int"}"#).unwrap(), Schema::Int);
    assert_eq!(
        parse_schema(r#"{"type": "string"}"#).unwrap(),
        Schema::String
    );
}

// ============================================================================
// Parser Tests - Complex Types
// ============================================================================

#[test]
fn test_parse_record_with_defaults_and_order() {
    let json = r#"{
        "type": "record",
        "name": "User",
        "namespace": "com.example",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "score", "type": "int", "default": 7, "order": "descending"},
            {"name": "name", "type": "string", "aliases": ["fullName"]}
        ]
    }"#;

    let schema = parse_schema(json).unwrap();
    let Schema::Record(record) = schema else {
        panic!("expected record, got {:?}", schema);
    };
    assert_eq!(record.fullname(), "com.example.User");
    assert_eq!(record.fields[1].default, Some(serde_json::json!(7)));
    assert_eq!(record.fields[1].order, FieldOrder::Descending);
    assert!(record.fields[2].responds_to("fullName"));
    assert_eq!(record.fields[2].position, 2);
}

#[test]
fn test_parse_enum_with_default() {
    let json = r#"{
        "type": "enum",
        "name": "Suit",
        "symbols": ["HEART", "SPADE", "CLUB", "DIAMOND"],
        "default": "HEART"
    }"#;

    let schema = parse_schema(json).unwrap();
    let Schema::Enum(e) = schema else {
        panic!("expected enum");
    };
    assert_eq!(e.symbols.len(), 4);
    assert_eq!(e.default.as_deref(), Some("HEART"));
    assert_eq!(e.symbol_index("CLUB"), Some(2));
}

#[test]
fn test_parse_enum_rejects_unknown_default() {
    let json = r#"{
        "type": "enum",
        "name": "Suit",
        "symbols": ["HEART"],
        "default": "JOKER"
    }"#;
    assert!(parse_schema(json).is_err());
}

#[test]
fn test_parse_fixed() {
    let schema =
        parse_schema(r#"{"type": "fixed", "name": "Md5", "size": 16}"#).unwrap();
    let Schema::Fixed(f) = schema else {
        panic!("expected fixed");
    };
    assert_eq!(f.size, 16);
}

#[test]
fn test_parse_array_and_map() {
    let schema = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
    assert_eq!(schema, Schema::Array(Box::new(Schema::Int)));

    let schema = parse_schema(r#"{"type": "map", "values": "string"}"#).unwrap();
    assert_eq!(schema, Schema::Map(Box::new(Schema::String)));
}

// ============================================================================
// Parser Tests - Named Type Resolution
// ============================================================================

#[test]
fn test_recursive_record_reference() {
    let json = r#"{
        "type": "record",
        "name": "Node",
        "fields": [
            {"name": "value", "type": "int"},
            {"name": "next", "type": ["null", "Node"]}
        ]
    }"#;

    let schema = parse_schema(json).unwrap();
    let Schema::Record(record) = &schema else {
        panic!("expected record");
    };
    let Schema::Union(branches) = &record.fields[1].schema else {
        panic!("expected union");
    };
    assert_eq!(branches[1], Schema::Named("Node".to_string()));

    // The context links the reference back to the definition
    let context = SchemaContext::from_schema(&schema);
    assert!(matches!(
        context.deref(&branches[1]).unwrap(),
        Schema::Record(_)
    ));
}

#[test]
fn test_namespace_qualifies_nested_references() {
    let json = r#"{
        "type": "record",
        "name": "Outer",
        "namespace": "org.test",
        "fields": [
            {"name": "inner", "type": {
                "type": "record",
                "name": "Inner",
                "fields": [{"name": "x", "type": "int"}]
            }},
            {"name": "again", "type": "Inner"}
        ]
    }"#;

    let schema = parse_schema(json).unwrap();
    let Schema::Record(record) = &schema else {
        panic!("expected record");
    };
    assert_eq!(
        record.fields[1].schema,
        Schema::Named("org.test.Inner".to_string())
    );
}

// ============================================================================
// Parser Tests - Logical Types
// ============================================================================

#[test]
fn test_parse_logical_type_bindings() {
    let schema =
        parse_schema(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();
    let Schema::Logical(lt) = &schema else {
        panic!("expected logical binding");
    };
    assert_eq!(lt.name, "timestamp-millis");
    assert_eq!(*lt.base, Schema::Long);

    let schema = parse_schema(
        r#"{"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}"#,
    )
    .unwrap();
    let Schema::Logical(lt) = &schema else {
        panic!("expected logical binding");
    };
    assert_eq!(lt.precision(), Some(10));
    assert_eq!(lt.scale(), 2);
}

#[test]
fn test_decimal_requires_precision() {
    let result = parse_schema(r#"{"type": "bytes", "logicalType": "decimal"}"#);
    assert!(result.is_err());
}

#[test]
fn test_parse_instant_string_with_format() {
    let schema = parse_schema(
        r#"{"type": "string", "logicalType": "instant", "format": "%Y-%m-%d %H:%M:%S%z"}"#,
    )
    .unwrap();
    let Schema::Logical(lt) = &schema else {
        panic!("expected logical binding");
    };
    assert_eq!(lt.format(), Some("%Y-%m-%d %H:%M:%S%z"));
}

// ============================================================================
// Parser Tests - Union Validation
// ============================================================================

#[test]
fn test_union_duplicates_rejected_in_strict_mode() {
    assert!(parse_schema_with_options(r#"["int", "int"]"#, true).is_err());
    // Permissive mode warns but parses
    assert!(parse_schema_with_options(r#"["int", "int"]"#, false).is_ok());
}

#[test]
fn test_nested_union_rejected_in_strict_mode() {
    assert!(parse_schema_with_options(r#"[["int"], "string"]"#, true).is_err());
}

#[test]
fn test_two_named_types_share_a_union() {
    let json = r#"[
        {"type": "record", "name": "A", "fields": [{"name": "x", "type": "int"}]},
        {"type": "record", "name": "B", "fields": [{"name": "y", "type": "int"}]}
    ]"#;
    assert!(parse_schema_with_options(json, true).is_ok());
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_schema_to_json_roundtrip() {
    let json = r#"{
        "type": "record",
        "name": "Point",
        "fields": [
            {"name": "x", "type": "int"},
            {"name": "y", "type": ["null", "double"], "default": null}
        ]
    }"#;

    let schema = parse_schema(json).unwrap();
    let reparsed = parse_schema(&schema.to_json()).unwrap();
    assert_eq!(schema, reparsed);
}

#[test]
fn test_open_properties_survive_roundtrip() {
    let json = r#"{
        "type": "record",
        "name": "Tagged",
        "customProp": {"nested": [1, 2]},
        "fields": [{"name": "x", "type": "int"}]
    }"#;

    let schema = parse_schema(json).unwrap();
    let Schema::Record(record) = &schema else {
        panic!("expected record");
    };
    assert_eq!(
        record.properties.get("customProp"),
        Some(&serde_json::json!({"nested": [1, 2]}))
    );
    let reparsed = parse_schema(&schema.to_json()).unwrap();
    assert_eq!(schema, reparsed);
}

// ============================================================================
// Fingerprint Tests
// ============================================================================

#[test]
fn test_fingerprint_ignores_docs_and_aliases() {
    let bare = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )
    .unwrap();
    let annotated = parse_schema(
        r#"{"type": "record", "name": "R", "doc": "docs", "aliases": ["Old"],
            "fields": [{"name": "a", "type": "int", "doc": "field", "default": 0}]}"#,
    )
    .unwrap();

    assert_eq!(fingerprint64(&bare), fingerprint64(&annotated));
    assert_eq!(
        parsing_canonical_form(&bare),
        parsing_canonical_form(&annotated)
    );
}

#[test]
fn test_fingerprint_distinguishes_field_order() {
    let ab = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"}, {"name": "b", "type": "int"}]}"#,
    )
    .unwrap();
    let ba = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "b", "type": "int"}, {"name": "a", "type": "int"}]}"#,
    )
    .unwrap();
    assert_ne!(fingerprint64(&ab), fingerprint64(&ba));
}
