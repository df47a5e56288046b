//! Decode throughput benchmarks for the binary and JSON codecs.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use contrail::{
    decode_binary, decode_json, encode_binary, encode_json, parse_schema, Schema, Value,
};

fn sample_schema() -> Schema {
    parse_schema(
        r#"{
            "type": "record",
            "name": "Event",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "kind", "type": {"type": "enum", "name": "Kind",
                    "symbols": ["CREATE", "UPDATE", "DELETE"]}},
                {"name": "payload", "type": "string"},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "score", "type": ["null", "double"]}
            ]
        }"#,
    )
    .unwrap()
}

fn sample_value(i: i64) -> Value {
    Value::Record(vec![
        ("id".to_string(), Value::Long(i)),
        (
            "kind".to_string(),
            Value::Enum((i % 3) as u32, ["CREATE", "UPDATE", "DELETE"][(i % 3) as usize].to_string()),
        ),
        (
            "payload".to_string(),
            Value::String(format!("payload body number {}", i)),
        ),
        (
            "tags".to_string(),
            Value::Array(vec![
                Value::String("alpha".to_string()),
                Value::String("beta".to_string()),
            ]),
        ),
        (
            "score".to_string(),
            Value::Union(1, Box::new(Value::Double(i as f64 * 0.5))),
        ),
    ])
}

fn bench_binary_decode(c: &mut Criterion) {
    let schema = sample_schema();
    let bytes = encode_binary(&sample_value(42), &schema).unwrap();

    let mut group = c.benchmark_group("binary");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("decode_record", |b| {
        b.iter(|| decode_binary(black_box(&bytes), &schema).unwrap())
    });
    group.bench_function("encode_record", |b| {
        let value = sample_value(42);
        b.iter(|| encode_binary(black_box(&value), &schema).unwrap())
    });
    group.finish();
}

fn bench_json_decode(c: &mut Criterion) {
    let schema = sample_schema();
    let text = encode_json(&sample_value(42), &schema).unwrap();

    let mut group = c.benchmark_group("json");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("decode_record", |b| {
        b.iter(|| decode_json(black_box(&text), &schema).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_binary_decode, bench_json_decode);
criterion_main!(benches);
