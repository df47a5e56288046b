//! The `any` escape hatch.
//!
//! A structural escape embedding an arbitrary value alongside its schema
//! in a record of `{avsc: string, content: bytes}`. The binary form
//! stores `content` as the binary-encoded value under the embedded
//! schema; the JSON form stores `avsc` as the schema's JSON text and
//! `content` as inline JSON.

use serde_json::{json, Value as JsonValue};

use crate::binary::{BinaryDecoder, BinaryEncoder};
use crate::codec::{JsonExtensionDecoder, JsonExtensionEncoder};
use crate::datum::{DatumReader, DatumWriter};
use crate::error::CodecError;
use crate::json::{JsonDecoder, JsonEncoder};
use crate::logical::{Conversion, DatumModel};
use crate::schema::{parse_schema, LogicalSchema, Schema};
use crate::value::Value;

pub struct AnyConversion;

impl AnyConversion {
    fn embedded_model() -> DatumModel {
        // The escape hatch decodes with the standard catalogue; it makes
        // no promise about custom conversions
        DatumModel::new()
    }

    fn split_record(fields: &[(String, Value)]) -> Result<(&str, &[u8]), CodecError> {
        let mut avsc = None;
        let mut content = None;
        for (name, value) in fields {
            match (name.as_str(), value) {
                ("avsc", Value::String(s)) => avsc = Some(s.as_str()),
                ("content", Value::Bytes(b)) => content = Some(b.as_slice()),
                _ => {}
            }
        }
        match (avsc, content) {
            (Some(a), Some(c)) => Ok((a, c)),
            _ => Err(CodecError::logical(
                "any",
                "record needs string 'avsc' and bytes 'content' fields",
            )),
        }
    }

    fn parse_embedded_schema(text: &str) -> Result<Schema, CodecError> {
        parse_schema(text)
            .map_err(|e| CodecError::logical("any", format!("embedded schema invalid: {}", e)))
    }

    fn decode_binary_content(schema: &Schema, content: &[u8]) -> Result<Value, CodecError> {
        let model = Self::embedded_model();
        let reader = DatumReader::with_model(schema.clone(), model);
        let mut decoder = BinaryDecoder::new(content);
        reader.read(&mut decoder).map_err(|e| {
            CodecError::logical_caused("any", "embedded binary value unreadable", e)
        })
    }
}

impl Conversion for AnyConversion {
    fn logical_type_name(&self) -> &'static str {
        "any"
    }

    fn from_wire(&self, wire: Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        let Value::Record(fields) = wire else {
            return Err(CodecError::logical(
                "any",
                format!("expected record wire value, found {}", wire.type_name()),
            ));
        };
        let (avsc, content) = Self::split_record(&fields)?;
        let schema = Self::parse_embedded_schema(avsc)?;
        let value = Self::decode_binary_content(&schema, content)?;
        Ok(Value::Any {
            schema: Box::new(schema),
            value: Box::new(value),
        })
    }

    fn to_wire(&self, value: &Value, _logical: &LogicalSchema) -> Result<Value, CodecError> {
        match value {
            Value::Any { schema, value } => {
                let model = Self::embedded_model();
                let writer = DatumWriter::with_model((**schema).clone(), model);
                let mut encoder = BinaryEncoder::new();
                writer.write(value, &mut encoder)?;
                Ok(Value::Record(vec![
                    ("avsc".to_string(), Value::String(schema.to_json())),
                    ("content".to_string(), Value::Bytes(encoder.into_bytes())),
                ]))
            }
            // Already wire-shaped records pass through
            Value::Record(fields) if Self::split_record(fields).is_ok() => Ok(value.clone()),
            other => Err(CodecError::logical(
                "any",
                format!("cannot serialize {} as any", other.type_name()),
            )),
        }
    }

    fn direct_json_decode(
        &self,
        decoder: &mut dyn JsonExtensionDecoder,
        logical: &LogicalSchema,
    ) -> Option<Result<Value, CodecError>> {
        let tree = match decoder.read_value_as_tree(&logical.base) {
            Ok(tree) => tree,
            Err(e) => return Some(Err(e)),
        };
        Some(decode_json_form(&tree))
    }

    fn direct_json_encode(
        &self,
        value: &Value,
        encoder: &mut dyn JsonExtensionEncoder,
        logical: &LogicalSchema,
    ) -> Result<bool, CodecError> {
        let Value::Any { schema, value } = value else {
            return Ok(false);
        };

        let model = Self::embedded_model();
        let writer = DatumWriter::with_model((**schema).clone(), model);
        let mut embedded = JsonEncoder::new(schema)?;
        writer.write(value, &mut embedded)?;
        let content = embedded.into_value()?;

        let tree = json!({
            "avsc": schema.to_json(),
            "content": content,
        });
        encoder.write_json_value(&tree, &logical.base)?;
        Ok(true)
    }
}

fn decode_json_form(tree: &JsonValue) -> Result<Value, CodecError> {
    let avsc = tree
        .get("avsc")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CodecError::logical("any", "JSON form needs a string 'avsc' member"))?;
    let schema = AnyConversion::parse_embedded_schema(avsc)?;

    let content = tree
        .get("content")
        .ok_or_else(|| CodecError::logical("any", "JSON form needs a 'content' member"))?;

    // A string content is the plain encoder's byte form; anything else
    // is inline JSON
    let value = match content {
        JsonValue::String(s) => {
            let bytes: Result<Vec<u8>, CodecError> = s
                .chars()
                .map(|c| {
                    u8::try_from(c as u32).map_err(|_| {
                        CodecError::logical("any", format!("content holds non-latin1 char {:?}", c))
                    })
                })
                .collect();
            AnyConversion::decode_binary_content(&schema, &bytes?)?
        }
        inline => {
            let model = AnyConversion::embedded_model();
            let reader = DatumReader::with_model(schema.clone(), model);
            let mut decoder = JsonDecoder::from_value(&schema, inline, true)?;
            let value = reader.read(&mut decoder).map_err(|e| {
                CodecError::logical_caused("any", "embedded JSON value unreadable", e)
            })?;
            value
        }
    };

    Ok(Value::Any {
        schema: Box::new(schema),
        value: Box::new(value),
    })
}
