//! Tests for writer/reader schema resolution through the resolving
//! decoder.

use contrail::{
    decode_binary_resolved, encode_binary, parse_schema, CodecError, Schema, Value,
};

fn resolve(value: &Value, writer: &Schema, reader: &Schema) -> Result<Value, CodecError> {
    let bytes = encode_binary(value, writer)?;
    decode_binary_resolved(&bytes, writer, reader)
}

// ============================================================================
// Primitive Promotion Tests
// ============================================================================

#[test]
fn test_int_promotes_to_long() {
    // Writer int 300 is the bytes 0xD8 0x04
    let bytes = encode_binary(&Value::Int(300), &Schema::Int).unwrap();
    assert_eq!(bytes, vec![0xD8, 0x04]);

    let value = decode_binary_resolved(&bytes, &Schema::Int, &Schema::Long).unwrap();
    assert_eq!(value, Value::Long(300));
}

#[test]
fn test_numeric_promotion_matrix() {
    let int = Value::Int(7);
    assert_eq!(
        resolve(&int, &Schema::Int, &Schema::Float).unwrap(),
        Value::Float(7.0)
    );
    assert_eq!(
        resolve(&int, &Schema::Int, &Schema::Double).unwrap(),
        Value::Double(7.0)
    );
    let long = Value::Long(9);
    assert_eq!(
        resolve(&long, &Schema::Long, &Schema::Float).unwrap(),
        Value::Float(9.0)
    );
    assert_eq!(
        resolve(&long, &Schema::Long, &Schema::Double).unwrap(),
        Value::Double(9.0)
    );
    assert_eq!(
        resolve(&Value::Float(1.5), &Schema::Float, &Schema::Double).unwrap(),
        Value::Double(1.5)
    );
}

#[test]
fn test_string_bytes_promotions() {
    assert_eq!(
        resolve(
            &Value::String("hi".to_string()),
            &Schema::String,
            &Schema::Bytes
        )
        .unwrap(),
        Value::Bytes(b"hi".to_vec())
    );
    assert_eq!(
        resolve(&Value::Bytes(b"hi".to_vec()), &Schema::Bytes, &Schema::String).unwrap(),
        Value::String("hi".to_string())
    );
}

#[test]
fn test_incompatible_primitives_fail() {
    let result = resolve(&Value::Long(1), &Schema::Long, &Schema::Int);
    assert!(result.is_err());
}

// ============================================================================
// Record Resolution Tests
// ============================================================================

fn writer_record() -> Schema {
    parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "double"}
            ]
        }"#,
    )
    .unwrap()
}

fn sample_record() -> Value {
    Value::Record(vec![
        ("a".to_string(), Value::Int(1)),
        ("b".to_string(), Value::String("x".to_string())),
        ("c".to_string(), Value::Double(2.5)),
    ])
}

#[test]
fn test_identity_resolution_matches_plain_decode() {
    let schema = writer_record();
    let value = sample_record();
    assert_eq!(resolve(&value, &schema, &schema).unwrap(), value);
}

#[test]
fn test_writer_only_fields_are_skipped() {
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [{"name": "b", "type": "string"}]
        }"#,
    )
    .unwrap();

    let value = resolve(&sample_record(), &writer_record(), &reader).unwrap();
    assert_eq!(
        value,
        Value::Record(vec![("b".to_string(), Value::String("x".to_string()))])
    );
}

#[test]
fn test_reader_defaults_injected_for_missing_fields() {
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "double"},
                {"name": "d", "type": "int", "default": 41},
                {"name": "e", "type": {"type": "array", "items": "int"}, "default": [1, 2]}
            ]
        }"#,
    )
    .unwrap();

    let value = resolve(&sample_record(), &writer_record(), &reader).unwrap();
    assert_eq!(
        value.field("d"),
        Some(&Value::Int(41)),
        "scalar default injected"
    );
    assert_eq!(
        value.field("e"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2)])),
        "array default injected"
    );
    // Writer-carried fields are untouched
    assert_eq!(value.field("a"), Some(&Value::Int(1)));
}

#[test]
fn test_missing_field_without_default_fails() {
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "missing", "type": "int"}
            ]
        }"#,
    )
    .unwrap();

    let result = resolve(&sample_record(), &writer_record(), &reader);
    assert!(matches!(result, Err(CodecError::MissingField(name)) if name == "missing"));
}

#[test]
fn test_reader_declaration_order_rebuilt() {
    // The reader declares fields in a different order than the writer
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "c", "type": "double"},
                {"name": "a", "type": "int"}
            ]
        }"#,
    )
    .unwrap();

    let value = resolve(&sample_record(), &writer_record(), &reader).unwrap();
    // Wire order is the writer's, output order is the reader's
    assert_eq!(
        value,
        Value::Record(vec![
            ("c".to_string(), Value::Double(2.5)),
            ("a".to_string(), Value::Int(1)),
        ])
    );
}

#[test]
fn test_field_matched_through_reader_alias() {
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "renamed", "type": "int", "aliases": ["a"]}
            ]
        }"#,
    )
    .unwrap();

    let value = resolve(&sample_record(), &writer_record(), &reader).unwrap();
    assert_eq!(value.field("renamed"), Some(&Value::Int(1)));
}

#[test]
fn test_record_matched_through_reader_alias() {
    let writer = parse_schema(
        r#"{"type": "record", "name": "Old", "fields": [{"name": "x", "type": "int"}]}"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{"type": "record", "name": "New", "aliases": ["Old"],
            "fields": [{"name": "x", "type": "int"}]}"#,
    )
    .unwrap();

    let value = Value::Record(vec![("x".to_string(), Value::Int(5))]);
    assert_eq!(resolve(&value, &writer, &reader).unwrap(), value);
}

#[test]
fn test_promotion_inside_record_field() {
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "bytes"},
                {"name": "c", "type": "double"}
            ]
        }"#,
    )
    .unwrap();

    let value = resolve(&sample_record(), &writer_record(), &reader).unwrap();
    assert_eq!(value.field("a"), Some(&Value::Long(1)));
    assert_eq!(value.field("b"), Some(&Value::Bytes(b"x".to_vec())));
}

// ============================================================================
// Enum Resolution Tests
// ============================================================================

#[test]
fn test_enum_ordinals_remap_by_symbol() {
    let writer =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#).unwrap();
    let reader =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["C", "A"]}"#).unwrap();

    let value = resolve(&Value::Enum(2, "C".to_string()), &writer, &reader).unwrap();
    assert_eq!(value, Value::Enum(0, "C".to_string()));
}

#[test]
fn test_unmatched_enum_symbol_uses_reader_default() {
    let writer =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#).unwrap();
    let reader = parse_schema(
        r#"{"type": "enum", "name": "E", "symbols": ["A", "B"], "default": "A"}"#,
    )
    .unwrap();

    let value = resolve(&Value::Enum(2, "C".to_string()), &writer, &reader).unwrap();
    assert_eq!(value, Value::Enum(0, "A".to_string()));
}

#[test]
fn test_unmatched_enum_symbol_without_default_fails() {
    let writer =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#).unwrap();
    let reader =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#).unwrap();

    let result = resolve(&Value::Enum(2, "C".to_string()), &writer, &reader);
    assert!(result.is_err());
}

// ============================================================================
// Union Resolution Tests
// ============================================================================

#[test]
fn test_writer_union_reader_plain() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let value = resolve(
        &Value::Union(0, Box::new(Value::Int(3))),
        &writer,
        &Schema::Long,
    )
    .unwrap();
    assert_eq!(value, Value::Long(3));
}

#[test]
fn test_writer_union_branch_reader_cannot_accept() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let result = resolve(
        &Value::Union(1, Box::new(Value::String("x".to_string()))),
        &writer,
        &Schema::Long,
    );
    assert!(matches!(result, Err(CodecError::UnionBranch(_))));
}

#[test]
fn test_plain_writer_reader_union() {
    let reader = parse_schema(r#"["null", "string", "int"]"#).unwrap();
    let value = resolve(&Value::Int(4), &Schema::Int, &reader).unwrap();
    assert_eq!(value, Value::Union(2, Box::new(Value::Int(4))));
}

#[test]
fn test_union_to_union_reindexing() {
    let writer = parse_schema(r#"["int", "string"]"#).unwrap();
    let reader = parse_schema(r#"["string", "null", "int"]"#).unwrap();

    let value = resolve(&Value::Union(0, Box::new(Value::Int(8))), &writer, &reader).unwrap();
    assert_eq!(value, Value::Union(2, Box::new(Value::Int(8))));

    let value = resolve(
        &Value::Union(1, Box::new(Value::String("s".to_string()))),
        &writer,
        &reader,
    )
    .unwrap();
    assert_eq!(value, Value::Union(0, Box::new(Value::String("s".to_string()))));
}

// ============================================================================
// Fixed Resolution Tests
// ============================================================================

#[test]
fn test_fixed_sizes_must_match() {
    let writer = parse_schema(r#"{"type": "fixed", "name": "F", "size": 2}"#).unwrap();
    let reader = parse_schema(r#"{"type": "fixed", "name": "F", "size": 3}"#).unwrap();

    let result = resolve(&Value::Fixed(vec![1, 2]), &writer, &reader);
    assert!(matches!(result, Err(CodecError::TypeMismatch { .. })));
}

#[test]
fn test_fixed_identity_resolution() {
    let schema = parse_schema(r#"{"type": "fixed", "name": "F", "size": 2}"#).unwrap();
    let value = Value::Fixed(vec![9, 8]);
    assert_eq!(resolve(&value, &schema, &schema).unwrap(), value);
}

// ============================================================================
// Structured Resolution Tests
// ============================================================================

#[test]
fn test_array_items_resolve() {
    let writer = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
    let reader = parse_schema(r#"{"type": "array", "items": "long"}"#).unwrap();

    let value = resolve(
        &Value::Array(vec![Value::Int(1), Value::Int(2)]),
        &writer,
        &reader,
    )
    .unwrap();
    assert_eq!(value, Value::Array(vec![Value::Long(1), Value::Long(2)]));
}

#[test]
fn test_map_values_resolve() {
    let writer = parse_schema(r#"{"type": "map", "values": "int"}"#).unwrap();
    let reader = parse_schema(r#"{"type": "map", "values": "double"}"#).unwrap();

    let value = resolve(
        &Value::Map(vec![("k".to_string(), Value::Int(3))]),
        &writer,
        &reader,
    )
    .unwrap();
    assert_eq!(value, Value::Map(vec![("k".to_string(), Value::Double(3.0))]));
}

#[test]
fn test_record_inside_array_with_trailing_skip() {
    // The skipped writer field sits after the last reader field, so the
    // skip runs as a trailing action between array items
    let writer = parse_schema(
        r#"{"type": "array", "items": {
            "type": "record", "name": "R", "fields": [
                {"name": "keep", "type": "int"},
                {"name": "drop", "type": "string"}
            ]}}"#,
    )
    .unwrap();
    let reader = parse_schema(
        r#"{"type": "array", "items": {
            "type": "record", "name": "R", "fields": [
                {"name": "keep", "type": "int"}
            ]}}"#,
    )
    .unwrap();

    let item = |n: i32, s: &str| {
        Value::Record(vec![
            ("keep".to_string(), Value::Int(n)),
            ("drop".to_string(), Value::String(s.to_string())),
        ])
    };
    let value = resolve(
        &Value::Array(vec![item(1, "a"), item(2, "b")]),
        &writer,
        &reader,
    )
    .unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Record(vec![("keep".to_string(), Value::Int(1))]),
            Value::Record(vec![("keep".to_string(), Value::Int(2))]),
        ])
    );
}

#[test]
fn test_recursive_record_resolution() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "next", "type": ["null", "Node"]}
            ]
        }"#,
    )
    .unwrap();

    let leaf = Value::Record(vec![
        ("value".to_string(), Value::Int(2)),
        ("next".to_string(), Value::Union(0, Box::new(Value::Null))),
    ]);
    let value = Value::Record(vec![
        ("value".to_string(), Value::Int(1)),
        ("next".to_string(), Value::Union(1, Box::new(leaf))),
    ]);
    assert_eq!(resolve(&value, &schema, &schema).unwrap(), value);
}

#[test]
fn test_new_reader_field_does_not_disturb_existing() {
    // Reader-default idempotence: adding a defaulted field leaves the
    // other decoded values unchanged
    let writer = writer_record();
    let reader = parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "string"},
                {"name": "c", "type": "double"},
                {"name": "extra", "type": ["null", "string"], "default": null}
            ]
        }"#,
    )
    .unwrap();

    let plain = resolve(&sample_record(), &writer, &writer).unwrap();
    let extended = resolve(&sample_record(), &writer, &reader).unwrap();
    for name in ["a", "b", "c"] {
        assert_eq!(plain.field(name), extended.field(name));
    }
    assert_eq!(
        extended.field("extra"),
        Some(&Value::Union(0, Box::new(Value::Null)))
    );
}
