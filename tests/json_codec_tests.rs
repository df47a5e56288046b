//! Tests for the extended JSON codec: field-order-agnostic decoding,
//! default injection, union tagging, lenient tolerance, and the bytes
//! extensions.

use contrail::{
    decode_json, decode_json_strict, encode_json, parse_schema, CodecError, Schema, Value,
};
use serde_json::json;

fn json_roundtrip(value: &Value, schema: &Schema) -> Value {
    let text = encode_json(value, schema).unwrap();
    decode_json(&text, schema).unwrap()
}

// ============================================================================
// Record Decoding Tests
// ============================================================================

fn abc_schema() -> Schema {
    parse_schema(
        r#"{
            "type": "record",
            "name": "R",
            "fields": [
                {"name": "a", "type": "int"},
                {"name": "b", "type": "int", "default": 7},
                {"name": "c", "type": "string"}
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_field_reorder_and_default_injection() {
    // Fields out of order and 'b' missing entirely
    let value = decode_json(r#"{"c": "x", "a": 1}"#, &abc_schema()).unwrap();
    assert_eq!(
        value,
        Value::Record(vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(7)),
            ("c".to_string(), Value::String("x".to_string())),
        ])
    );
}

#[test]
fn test_field_order_independence() {
    let schema = abc_schema();
    let expected = decode_json(r#"{"a": 1, "b": 2, "c": "x"}"#, &schema).unwrap();

    for permuted in [
        r#"{"a": 1, "c": "x", "b": 2}"#,
        r#"{"b": 2, "a": 1, "c": "x"}"#,
        r#"{"b": 2, "c": "x", "a": 1}"#,
        r#"{"c": "x", "a": 1, "b": 2}"#,
        r#"{"c": "x", "b": 2, "a": 1}"#,
    ] {
        assert_eq!(
            decode_json(permuted, &schema).unwrap(),
            expected,
            "input {}",
            permuted
        );
        assert_eq!(
            decode_json_strict(permuted, &schema).unwrap(),
            expected,
            "strict input {}",
            permuted
        );
    }
}

#[test]
fn test_missing_field_without_default_fails() {
    let result = decode_json(r#"{"a": 1, "b": 2}"#, &abc_schema());
    assert!(matches!(result, Err(CodecError::MissingField(name)) if name == "c"));
}

#[test]
fn test_strict_mode_rejects_unknown_trailing_field() {
    let schema = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )
    .unwrap();

    let result = decode_json_strict(r#"{"a": 1, "b": 2}"#, &schema);
    assert!(matches!(result, Err(CodecError::UnknownField(_))));

    let value = decode_json(r#"{"a": 1, "b": 2}"#, &schema).unwrap();
    assert_eq!(value, Value::Record(vec![("a".to_string(), Value::Int(1))]));
}

#[test]
fn test_strict_mode_rejects_unknown_leading_field() {
    let schema = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )
    .unwrap();

    let result = decode_json_strict(r#"{"b": 2, "a": 1}"#, &schema);
    assert!(matches!(result, Err(CodecError::UnknownField(_))));

    let value = decode_json(r#"{"b": 2, "a": 1}"#, &schema).unwrap();
    assert_eq!(value, Value::Record(vec![("a".to_string(), Value::Int(1))]));
}

#[test]
fn test_nested_record_reorder() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "Outer",
            "fields": [
                {"name": "inner", "type": {
                    "type": "record", "name": "Inner", "fields": [
                        {"name": "x", "type": "int"},
                        {"name": "y", "type": "int"}
                    ]}},
                {"name": "tail", "type": "string"}
            ]
        }"#,
    )
    .unwrap();

    let value = decode_json(
        r#"{"tail": "t", "inner": {"y": 2, "x": 1}}"#,
        &schema,
    )
    .unwrap();
    assert_eq!(
        value,
        Value::Record(vec![
            (
                "inner".to_string(),
                Value::Record(vec![
                    ("x".to_string(), Value::Int(1)),
                    ("y".to_string(), Value::Int(2)),
                ])
            ),
            ("tail".to_string(), Value::String("t".to_string())),
        ])
    );
}

#[test]
fn test_capture_depth_bound() {
    // The out-of-order capture tolerates nesting up to depth 8 and no
    // further
    let schema = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "z", "type": "int"}
        ]}"#,
    )
    .unwrap();

    let deep = r#"{"skipme": [[[[[[[[[1]]]]]]]]], "z": 5}"#;
    let result = decode_json(deep, &schema);
    assert!(matches!(result, Err(CodecError::Malformed(_))));

    let shallow = r#"{"skipme": [[[[1]]]], "z": 5}"#;
    let value = decode_json(shallow, &schema).unwrap();
    assert_eq!(value, Value::Record(vec![("z".to_string(), Value::Int(5))]));
}

// ============================================================================
// Union Tagging Tests
// ============================================================================

#[test]
fn test_nullable_single_union_unwrapped() {
    let schema = parse_schema(
        r#"["null", {"type": "record", "name": "Foo", "fields": [{"name": "x", "type": "int"}]}]"#,
    )
    .unwrap();

    let present = Value::Union(
        1,
        Box::new(Value::Record(vec![("x".to_string(), Value::Int(1))])),
    );
    let text = encode_json(&present, &schema).unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap(),
        json!({"x": 1})
    );
    assert_eq!(decode_json(&text, &schema).unwrap(), present);

    let absent = Value::Union(0, Box::new(Value::Null));
    let text = encode_json(&absent, &schema).unwrap();
    assert_eq!(text, "null");
    assert_eq!(decode_json(&text, &schema).unwrap(), absent);
}

#[test]
fn test_multi_branch_union_tagged() {
    let schema = parse_schema(r#"["null", "int", "string"]"#).unwrap();

    let value = Value::Union(1, Box::new(Value::Int(3)));
    let text = encode_json(&value, &schema).unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap(),
        json!({"int": 3})
    );
    assert_eq!(decode_json(&text, &schema).unwrap(), value);

    // The null branch stays unwrapped even in wide unions
    let value = Value::Union(0, Box::new(Value::Null));
    assert_eq!(encode_json(&value, &schema).unwrap(), "null");
}

#[test]
fn test_unknown_union_tag_fails() {
    let schema = parse_schema(r#"["int", "string"]"#).unwrap();
    let result = decode_json(r#"{"double": 1.5}"#, &schema);
    assert!(matches!(result, Err(CodecError::UnionBranch(_))));
}

// ============================================================================
// Bytes Extension Tests
// ============================================================================

#[test]
fn test_bytes_from_string_token() {
    let value = decode_json(r#""abÿ""#, &Schema::Bytes).unwrap();
    assert_eq!(value, Value::Bytes(vec![b'a', b'b', 0xFF]));
}

#[test]
fn test_bytes_from_integer_token_is_twos_complement() {
    // 256 as two's-complement big-integer bytes
    let value = decode_json("256", &Schema::Bytes).unwrap();
    assert_eq!(value, Value::Bytes(vec![0x01, 0x00]));

    let value = decode_json("-1", &Schema::Bytes).unwrap();
    assert_eq!(value, Value::Bytes(vec![0xFF]));
}

#[test]
fn test_bytes_roundtrip_via_latin1_string() {
    let value = Value::Bytes(vec![0, 1, 254, 255]);
    assert_eq!(json_roundtrip(&value, &Schema::Bytes), value);
}

// ============================================================================
// Collection and Enum Tests
// ============================================================================

#[test]
fn test_array_roundtrip() {
    let schema = parse_schema(r#"{"type": "array", "items": "long"}"#).unwrap();
    let value = Value::Array(vec![Value::Long(1), Value::Long(-5), Value::Long(0)]);
    assert_eq!(json_roundtrip(&value, &schema), value);

    let empty = Value::Array(vec![]);
    assert_eq!(json_roundtrip(&empty, &schema), empty);
}

#[test]
fn test_map_roundtrip() {
    let schema = parse_schema(r#"{"type": "map", "values": "boolean"}"#).unwrap();
    let value = Value::Map(vec![
        ("x".to_string(), Value::Boolean(true)),
        ("y".to_string(), Value::Boolean(false)),
    ]);
    assert_eq!(json_roundtrip(&value, &schema), value);
}

#[test]
fn test_enum_as_quoted_symbol() {
    let schema =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#).unwrap();
    let value = Value::Enum(1, "B".to_string());

    let text = encode_json(&value, &schema).unwrap();
    assert_eq!(text, r#""B""#);
    assert_eq!(decode_json(&text, &schema).unwrap(), value);

    let result = decode_json(r#""Z""#, &schema);
    assert!(matches!(result, Err(CodecError::TypeMismatch { .. })));
}

#[test]
fn test_fixed_roundtrip() {
    let schema = parse_schema(r#"{"type": "fixed", "name": "F", "size": 2}"#).unwrap();
    let value = Value::Fixed(vec![0x41, 0xFF]);
    assert_eq!(json_roundtrip(&value, &schema), value);
}

#[test]
fn test_record_roundtrip_emits_declaration_order() {
    let schema = abc_schema();
    let value = Value::Record(vec![
        ("a".to_string(), Value::Int(1)),
        ("b".to_string(), Value::Int(2)),
        ("c".to_string(), Value::String("s".to_string())),
    ]);

    let text = encode_json(&value, &schema).unwrap();
    assert_eq!(text, r#"{"a":1,"b":2,"c":"s"}"#);
    assert_eq!(decode_json(&text, &schema).unwrap(), value);
}

#[test]
fn test_map_of_records_roundtrip() {
    let schema = parse_schema(
        r#"{"type": "map", "values": {
            "type": "record", "name": "P", "fields": [
                {"name": "x", "type": "int"},
                {"name": "y", "type": "int"}
            ]}}"#,
    )
    .unwrap();
    let point = |x, y| {
        Value::Record(vec![
            ("x".to_string(), Value::Int(x)),
            ("y".to_string(), Value::Int(y)),
        ])
    };
    let value = Value::Map(vec![
        ("a".to_string(), point(1, 2)),
        ("b".to_string(), point(3, 4)),
    ]);
    assert_eq!(json_roundtrip(&value, &schema), value);
}
