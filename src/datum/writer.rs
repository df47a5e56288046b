//! Datum writer.
//!
//! The write-side counterpart of the datum reader: recurses over the
//! schema, consults the conversion registry at every logical node, and
//! resolves union branches from the value's shape before emitting any
//! byte.

use crate::codec::Encoder;
use crate::error::CodecError;
use crate::logical::DatumModel;
use crate::schema::{Schema, SchemaContext};
use crate::value::Value;

/// Writes value trees shaped by a schema.
pub struct DatumWriter {
    schema: Schema,
    context: SchemaContext,
    model: DatumModel,
}

impl DatumWriter {
    /// A writer with the standard conversion catalogue.
    pub fn new(schema: Schema) -> Self {
        Self::with_model(schema, DatumModel::new())
    }

    /// A writer with an explicit datum model.
    pub fn with_model(schema: Schema, model: DatumModel) -> Self {
        let context = SchemaContext::from_schema(&schema);
        Self {
            schema,
            context,
            model,
        }
    }

    /// The writer schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Write one datum.
    pub fn write(&self, value: &Value, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        self.write_value(value, &self.schema, encoder)
    }

    fn write_value(
        &self,
        value: &Value,
        schema: &Schema,
        encoder: &mut dyn Encoder,
    ) -> Result<(), CodecError> {
        let schema = self.context.deref(schema).map_err(CodecError::from)?;

        if let Some(logical) = schema.logical() {
            if let Some(conversion) = self.model.registry.get(&logical.name) {
                let conversion = conversion.clone();
                if let Some(ext) = encoder.json_extension() {
                    if conversion.direct_json_encode(value, ext, logical)? {
                        return Ok(());
                    }
                }
                let wire = conversion.to_wire(value, logical)?;
                return self.write_wire(&wire, &logical.base, encoder);
            }
        }

        self.write_wire(value, schema, encoder)
    }

    fn write_wire(
        &self,
        value: &Value,
        schema: &Schema,
        encoder: &mut dyn Encoder,
    ) -> Result<(), CodecError> {
        let mut schema = schema;
        loop {
            match schema {
                Schema::Logical(l) => schema = l.base.as_ref(),
                Schema::Named(_) => {
                    schema = self.context.deref(schema).map_err(CodecError::from)?
                }
                _ => break,
            }
        }
        match (schema, value) {
            (Schema::Null, Value::Null) => encoder.write_null(),
            (Schema::Boolean, Value::Boolean(b)) => encoder.write_boolean(*b),
            (Schema::Int, Value::Int(v)) => encoder.write_int(*v),
            (Schema::Long, Value::Long(v)) => encoder.write_long(*v),
            (Schema::Long, Value::Int(v)) => encoder.write_long(*v as i64),
            (Schema::Float, Value::Float(v)) => encoder.write_float(*v),
            (Schema::Float, Value::Int(v)) => encoder.write_float(*v as f32),
            (Schema::Float, Value::Long(v)) => encoder.write_float(*v as f32),
            (Schema::Double, Value::Double(v)) => encoder.write_double(*v),
            (Schema::Double, Value::Float(v)) => encoder.write_double(*v as f64),
            (Schema::Double, Value::Int(v)) => encoder.write_double(*v as f64),
            (Schema::Double, Value::Long(v)) => encoder.write_double(*v as f64),
            (Schema::Bytes, Value::Bytes(b)) => encoder.write_bytes(b),
            (Schema::Bytes, Value::String(s)) => encoder.write_bytes(s.as_bytes()),
            (Schema::String, Value::String(s)) => encoder.write_string(s),
            (Schema::String, Value::Bytes(b)) => {
                let s = std::str::from_utf8(b).map_err(|e| {
                    CodecError::Malformed(format!("string bytes are not UTF-8: {}", e))
                })?;
                encoder.write_string(s)
            }

            (Schema::Fixed(f), Value::Fixed(b) | Value::Bytes(b)) => {
                if b.len() != f.size {
                    return Err(CodecError::Malformed(format!(
                        "fixed value has {} bytes, schema wants {}",
                        b.len(),
                        f.size
                    )));
                }
                encoder.write_fixed(b)
            }

            (Schema::Enum(e), Value::Enum(ordinal, symbol)) => {
                // The symbol wins when it resolves; the ordinal is a
                // fallback for symbol-less values
                let ordinal = e
                    .symbol_index(symbol)
                    .unwrap_or(*ordinal as usize);
                if ordinal >= e.symbols.len() {
                    return Err(CodecError::Malformed(format!(
                        "enum ordinal {} out of range for '{}'",
                        ordinal, e.name
                    )));
                }
                encoder.write_enum(ordinal)
            }
            (Schema::Enum(e), Value::String(symbol)) => {
                let ordinal = e.symbol_index(symbol).ok_or_else(|| {
                    CodecError::Malformed(format!(
                        "'{}' is not a symbol of enum '{}'",
                        symbol, e.name
                    ))
                })?;
                encoder.write_enum(ordinal)
            }

            (Schema::Array(items), Value::Array(values)) => {
                encoder.write_array_start()?;
                encoder.set_item_count(values.len() as u64)?;
                for item in values {
                    encoder.start_item()?;
                    self.write_value(item, items, encoder)?;
                }
                encoder.write_array_end()
            }

            (Schema::Map(value_schema), Value::Map(entries)) => {
                encoder.write_map_start()?;
                encoder.set_item_count(entries.len() as u64)?;
                for (key, entry) in entries {
                    encoder.start_item()?;
                    encoder.write_string(key)?;
                    self.write_value(entry, value_schema, encoder)?;
                }
                encoder.write_map_end()
            }

            (Schema::Union(branches), value) => {
                let (index, inner) = match value {
                    Value::Union(index, inner) => {
                        if *index >= branches.len() {
                            return Err(CodecError::UnionBranch(format!(
                                "union index {} out of range (0..{})",
                                index,
                                branches.len()
                            )));
                        }
                        (*index, inner.as_ref())
                    }
                    other => (self.union_branch_index(other, branches)?, other),
                };
                encoder.write_index(index)?;
                self.write_value(inner, &branches[index], encoder)
            }

            (Schema::Record(r), Value::Record(fields)) => {
                for field in &r.fields {
                    let value = fields
                        .iter()
                        .find(|(name, _)| name == &field.name)
                        .map(|(_, v)| v)
                        .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                    self.write_value(value, &field.schema, encoder)?;
                }
                Ok(())
            }

            (schema, value) => Err(CodecError::type_mismatch(
                schema.branch_label(),
                value.type_name(),
            )),
        }
    }

    /// Pick the union branch a bare value belongs to; failing here emits
    /// nothing.
    fn union_branch_index(
        &self,
        value: &Value,
        branches: &[Schema],
    ) -> Result<usize, CodecError> {
        for (index, branch) in branches.iter().enumerate() {
            let branch = self.context.deref(branch).map_err(CodecError::from)?;
            if self.value_fits(value, branch) {
                return Ok(index);
            }
        }
        Err(CodecError::UnionBranch(format!(
            "{} value matches no union branch",
            value.type_name()
        )))
    }

    fn value_fits(&self, value: &Value, branch: &Schema) -> bool {
        // Typed views bind to their logical type name first
        if let Some(logical) = branch.logical() {
            return match (value, logical.name.as_str()) {
                (Value::Date(_), "date") => true,
                (Value::Timestamp(_), "timestamp-millis" | "timestamp-micros" | "instant") => true,
                (Value::Temporal(_), "any_temporal") => true,
                (Value::Decimal(_), "decimal") => true,
                (Value::BigInteger(_), "big-integer") => true,
                (Value::Uuid(_), "uuid") => true,
                (Value::Any { .. }, "any") => true,
                _ => self.value_fits(value, &logical.base),
            };
        }
        matches!(
            (value, branch),
            (Value::Null, Schema::Null)
                | (Value::Boolean(_), Schema::Boolean)
                | (Value::Int(_), Schema::Int)
                | (Value::Long(_), Schema::Long)
                | (Value::Float(_), Schema::Float)
                | (Value::Double(_), Schema::Double)
                | (Value::Bytes(_), Schema::Bytes)
                | (Value::String(_), Schema::String)
                | (Value::Fixed(_), Schema::Fixed(_))
                | (Value::Enum(..), Schema::Enum(_))
                | (Value::Array(_), Schema::Array(_))
                | (Value::Map(_), Schema::Map(_))
                | (Value::Record(_), Schema::Record(_))
        )
    }
}
