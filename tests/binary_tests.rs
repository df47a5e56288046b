//! Tests for the binary codec: wire fixtures and round-trips.

use contrail::{
    decode_binary, encode_binary, parse_schema, BinaryDecoder, CodecError, DatumReader, Limits,
    Schema, Value,
};

fn roundtrip(value: &Value, schema: &Schema) -> Value {
    let bytes = encode_binary(value, schema).unwrap();
    decode_binary(&bytes, schema).unwrap()
}

// ============================================================================
// Wire Fixture Tests
// ============================================================================

#[test]
fn test_int_zigzag_wire_bytes() {
    // 300 zigzag-encodes to 0xD8 0x04
    let bytes = encode_binary(&Value::Int(300), &Schema::Int).unwrap();
    assert_eq!(bytes, vec![0xD8, 0x04]);
}

#[test]
fn test_string_wire_bytes() {
    let bytes = encode_binary(&Value::String("abc".to_string()), &Schema::String).unwrap();
    assert_eq!(bytes, vec![0x06, b'a', b'b', b'c']);
}

#[test]
fn test_union_index_precedes_branch() {
    let schema = parse_schema(r#"["null", "int"]"#).unwrap();
    let bytes = encode_binary(
        &Value::Union(1, Box::new(Value::Int(1))),
        &schema,
    )
    .unwrap();
    // index 1 as zigzag long, then the int
    assert_eq!(bytes, vec![0x02, 0x02]);

    let bytes = encode_binary(&Value::Union(0, Box::new(Value::Null)), &schema).unwrap();
    assert_eq!(bytes, vec![0x00]);
}

#[test]
fn test_array_block_layout() {
    let schema = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
    let value = Value::Array(vec![Value::Int(1), Value::Int(2)]);
    let bytes = encode_binary(&value, &schema).unwrap();
    // count 2, items 1 and 2, terminator 0
    assert_eq!(bytes, vec![0x04, 0x02, 0x04, 0x00]);
}

#[test]
fn test_enum_as_ordinal() {
    let schema =
        parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#).unwrap();
    let bytes = encode_binary(&Value::Enum(2, "C".to_string()), &schema).unwrap();
    assert_eq!(bytes, vec![0x04]);
}

#[test]
fn test_fixed_as_raw_bytes() {
    let schema = parse_schema(r#"{"type": "fixed", "name": "F", "size": 3}"#).unwrap();
    let bytes = encode_binary(&Value::Fixed(vec![1, 2, 3]), &schema).unwrap();
    assert_eq!(bytes, vec![1, 2, 3]);
}

// ============================================================================
// Round-trip Tests
// ============================================================================

#[test]
fn test_primitive_roundtrips() {
    assert_eq!(roundtrip(&Value::Null, &Schema::Null), Value::Null);
    assert_eq!(
        roundtrip(&Value::Boolean(true), &Schema::Boolean),
        Value::Boolean(true)
    );
    assert_eq!(
        roundtrip(&Value::Int(i32::MIN), &Schema::Int),
        Value::Int(i32::MIN)
    );
    assert_eq!(
        roundtrip(&Value::Long(i64::MAX), &Schema::Long),
        Value::Long(i64::MAX)
    );
    assert_eq!(
        roundtrip(&Value::Float(1.5), &Schema::Float),
        Value::Float(1.5)
    );
    assert_eq!(
        roundtrip(&Value::Double(-2.25), &Schema::Double),
        Value::Double(-2.25)
    );
    assert_eq!(
        roundtrip(&Value::Bytes(vec![0, 255, 7]), &Schema::Bytes),
        Value::Bytes(vec![0, 255, 7])
    );
    assert_eq!(
        roundtrip(&Value::String("héllo".to_string()), &Schema::String),
        Value::String("héllo".to_string())
    );
}

#[test]
fn test_record_roundtrip() {
    let schema = parse_schema(
        r#"{
            "type": "record",
            "name": "User",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "name", "type": "string"},
                {"name": "active", "type": "boolean"}
            ]
        }"#,
    )
    .unwrap();

    let value = Value::Record(vec![
        ("id".to_string(), Value::Long(42)),
        ("name".to_string(), Value::String("ada".to_string())),
        ("active".to_string(), Value::Boolean(true)),
    ]);
    assert_eq!(roundtrip(&value, &schema), value);
}

#[test]
fn test_nested_collections_roundtrip() {
    let schema = parse_schema(
        r#"{"type": "map", "values": {"type": "array", "items": ["null", "int"]}}"#,
    )
    .unwrap();

    let value = Value::Map(vec![
        (
            "a".to_string(),
            Value::Array(vec![
                Value::Union(1, Box::new(Value::Int(1))),
                Value::Union(0, Box::new(Value::Null)),
            ]),
        ),
        ("b".to_string(), Value::Array(vec![])),
    ]);
    assert_eq!(roundtrip(&value, &schema), value);
}

#[test]
fn test_recursive_record_roundtrip() {
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
    assert_eq!(roundtrip(&value, &schema), value);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_truncated_input_fails() {
    let schema = Schema::String;
    let bytes = encode_binary(&Value::String("hello".to_string()), &schema).unwrap();
    let result = decode_binary(&bytes[..3], &schema);
    assert!(matches!(result, Err(CodecError::Malformed(_))));
}

#[test]
fn test_invalid_boolean_byte_fails() {
    let result = decode_binary(&[0x02], &Schema::Boolean);
    assert!(matches!(result, Err(CodecError::Malformed(_))));
}

#[test]
fn test_overlong_varint_fails() {
    let bytes = [0xFF; 11];
    let result = decode_binary(&bytes, &Schema::Long);
    assert!(matches!(result, Err(CodecError::Malformed(_))));
}

#[test]
fn test_capacity_limit_on_declared_count() {
    let schema = parse_schema(r#"{"type": "array", "items": "int"}"#).unwrap();
    // Declared count of one million items, no data behind it
    let mut bytes = Vec::new();
    contrail::binary::encode_zigzag(1_000_000, &mut bytes);

    let mut decoder = BinaryDecoder::with_limits(
        &bytes,
        Limits {
            max_collection_items: 1024,
        },
    );
    let result = DatumReader::new(schema).read(&mut decoder);
    assert!(matches!(result, Err(CodecError::Capacity { .. })));
}

#[test]
fn test_union_write_rejects_unmatched_value() {
    let schema = parse_schema(r#"["null", "int"]"#).unwrap();
    let result = encode_binary(&Value::String("nope".to_string()), &schema);
    assert!(matches!(result, Err(CodecError::UnionBranch(_))));
}

#[test]
fn test_missing_record_field_on_write() {
    let schema = parse_schema(
        r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
    )
    .unwrap();
    let result = encode_binary(&Value::Record(vec![]), &schema);
    assert!(matches!(result, Err(CodecError::MissingField(_))));
}
