//! Schema canonical form and fingerprinting.
//!
//! A schema's Parsing Canonical Form strips everything that does not
//! affect how data is parsed (docs, aliases, defaults, logical-type
//! metadata, property bags), inlines fully qualified names, orders the
//! remaining keys deterministically, and renders minimal JSON. The 64-bit
//! CRC fingerprint of that form is the cache key for compiled grammars.

use std::collections::HashSet;
use std::fmt::Write;

use crate::schema::Schema;

/// Seed and polynomial for the 64-bit schema fingerprint.
const EMPTY: u64 = 0xc15d213aa4d7a795;

/// Compute the 64-bit fingerprint of a schema's Parsing Canonical Form.
pub fn fingerprint64(schema: &Schema) -> u64 {
    fingerprint_bytes(parsing_canonical_form(schema).as_bytes())
}

/// Compute the 64-bit CRC of an arbitrary byte string using the schema
/// fingerprinting polynomial.
pub fn fingerprint_bytes(data: &[u8]) -> u64 {
    let table = fp_table();
    let mut fp = EMPTY;
    for &byte in data {
        fp = (fp >> 8) ^ table[((fp ^ byte as u64) & 0xff) as usize];
    }
    fp
}

fn fp_table() -> &'static [u64; 256] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut fp = i as u64;
            for _ in 0..8 {
                fp = (fp >> 1) ^ (EMPTY & 0u64.wrapping_sub(fp & 1));
            }
            *entry = fp;
        }
        table
    })
}

/// Render the Parsing Canonical Form of a schema.
///
/// The form keeps only `name`, `type`, `fields`, `symbols`, `items`,
/// `values`, and `size`, in that key order, with fully qualified names
/// inlined and repeated named types reduced to name references.
pub fn parsing_canonical_form(schema: &Schema) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    write_canonical(schema, &mut out, &mut seen);
    out
}

fn write_canonical(schema: &Schema, out: &mut String, seen: &mut HashSet<String>) {
    match schema {
        Schema::Null => out.push_str("\"null\""),
        Schema::Boolean => out.push_str("\"boolean\""),
        Schema::Int => out.push_str("\"int\""),
        Schema::Long => out.push_str("\"long\""),
        Schema::Float => out.push_str("\"float\""),
        Schema::Double => out.push_str("\"double\""),
        Schema::Bytes => out.push_str("\"bytes\""),
        Schema::String => out.push_str("\"string\""),

        // Logical-type metadata never participates in the canonical form
        Schema::Logical(l) => write_canonical(&l.base, out, seen),

        Schema::Named(name) => {
            let _ = write!(out, "{}", json_string(name));
        }

        Schema::Record(r) => {
            let fullname = r.fullname();
            if !seen.insert(fullname.clone()) {
                let _ = write!(out, "{}", json_string(&fullname));
                return;
            }
            let _ = write!(
                out,
                "{{\"name\":{},\"type\":\"record\",\"fields\":[",
                json_string(&fullname)
            );
            for (i, field) in r.fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{{\"name\":{},\"type\":", json_string(&field.name));
                write_canonical(&field.schema, out, seen);
                out.push('}');
            }
            out.push_str("]}");
        }

        Schema::Enum(e) => {
            let fullname = e.fullname();
            if !seen.insert(fullname.clone()) {
                let _ = write!(out, "{}", json_string(&fullname));
                return;
            }
            let _ = write!(
                out,
                "{{\"name\":{},\"type\":\"enum\",\"symbols\":[",
                json_string(&fullname)
            );
            for (i, symbol) in e.symbols.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", json_string(symbol));
            }
            out.push_str("]}");
        }

        Schema::Fixed(f) => {
            let fullname = f.fullname();
            if !seen.insert(fullname.clone()) {
                let _ = write!(out, "{}", json_string(&fullname));
                return;
            }
            let _ = write!(
                out,
                "{{\"name\":{},\"type\":\"fixed\",\"size\":{}}}",
                json_string(&fullname),
                f.size
            );
        }

        Schema::Array(items) => {
            out.push_str("{\"type\":\"array\",\"items\":");
            write_canonical(items, out, seen);
            out.push('}');
        }

        Schema::Map(values) => {
            out.push_str("{\"type\":\"map\",\"values\":");
            write_canonical(values, out, seen);
            out.push('}');
        }

        Schema::Union(branches) => {
            out.push('[');
            for (i, branch) in branches.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(branch, out, seen);
            }
            out.push(']');
        }
    }
}

/// Minimal JSON string escaping for schema names and symbols.
fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    #[test]
    fn test_primitive_canonical_form() {
        assert_eq!(parsing_canonical_form(&Schema::Int), "\"int\"");
        assert_eq!(parsing_canonical_form(&Schema::String), "\"string\"");
    }

    #[test]
    fn test_record_canonical_form_strips_metadata() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "Point",
                "namespace": "geo",
                "doc": "a point",
                "aliases": ["Coord"],
                "fields": [
                    {"name": "x", "type": "int", "default": 0, "doc": "x"},
                    {"name": "y", "type": "int"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            parsing_canonical_form(&schema),
            r#"{"name":"geo.Point","type":"record","fields":[{"name":"x","type":"int"},{"name":"y","type":"int"}]}"#
        );
    }

    #[test]
    fn test_logical_type_does_not_change_fingerprint() {
        let plain = parse_schema(r#""long""#).unwrap();
        let logical =
            parse_schema(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();
        assert_eq!(fingerprint64(&plain), fingerprint64(&logical));
    }

    #[test]
    fn test_distinct_schemas_have_distinct_fingerprints() {
        let a = parse_schema(r#""int""#).unwrap();
        let b = parse_schema(r#""long""#).unwrap();
        assert_ne!(fingerprint64(&a), fingerprint64(&b));
    }

    #[test]
    fn test_recursive_record_reference_collapses_to_name() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            parsing_canonical_form(&schema),
            r#"{"name":"Node","type":"record","fields":[{"name":"next","type":["null","Node"]}]}"#
        );
    }
}
