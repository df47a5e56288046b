//! Datum reader.
//!
//! Recurses over the reader schema, delegating wire access to a decoder
//! and typed-view conversion to the datum model's registry at every
//! node. Logical types with direct JSON support intercept the read
//! before the primitive value is touched.

use crate::codec::Decoder;
use crate::error::CodecError;
use crate::logical::{DatumModel, StringRepresentation};
use crate::schema::{Schema, SchemaContext};
use crate::value::Value;

/// Reads value trees shaped by a reader schema.
pub struct DatumReader {
    schema: Schema,
    context: SchemaContext,
    model: DatumModel,
}

impl DatumReader {
    /// A reader with the standard conversion catalogue.
    pub fn new(schema: Schema) -> Self {
        Self::with_model(schema, DatumModel::new())
    }

    /// A reader with an explicit datum model.
    pub fn with_model(schema: Schema, model: DatumModel) -> Self {
        let context = SchemaContext::from_schema(&schema);
        Self {
            schema,
            context,
            model,
        }
    }

    /// The reader schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read one datum.
    pub fn read(&self, decoder: &mut dyn Decoder) -> Result<Value, CodecError> {
        self.read_reusing(None, decoder)
    }

    /// Read one datum, reusing the allocations of a previous value where
    /// the shapes line up.
    pub fn read_reusing(
        &self,
        reuse: Option<Value>,
        decoder: &mut dyn Decoder,
    ) -> Result<Value, CodecError> {
        let value = self.read_value(reuse, &self.schema, decoder)?;
        decoder.drain()?;
        Ok(value)
    }

    fn read_value(
        &self,
        reuse: Option<Value>,
        schema: &Schema,
        decoder: &mut dyn Decoder,
    ) -> Result<Value, CodecError> {
        let schema = self.context.deref(schema).map_err(CodecError::from)?;

        if let Some(logical) = schema.logical() {
            if let Some(conversion) = self.model.registry.get(&logical.name) {
                let conversion = conversion.clone();
                if let Some(ext) = decoder.json_extension() {
                    if let Some(result) = conversion.direct_json_decode(ext, logical) {
                        return result;
                    }
                }
                let wire = self.read_wire(reuse, &logical.base, decoder)?;
                return conversion.from_wire(wire, logical);
            }
        }

        self.read_wire(reuse, schema, decoder)
    }

    fn read_wire(
        &self,
        reuse: Option<Value>,
        schema: &Schema,
        decoder: &mut dyn Decoder,
    ) -> Result<Value, CodecError> {
        // Follow references and strip logical bindings down to the wire
        // shape
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
        match schema {
            Schema::Null => {
                decoder.read_null()?;
                Ok(Value::Null)
            }
            Schema::Boolean => Ok(Value::Boolean(decoder.read_boolean()?)),
            Schema::Int => Ok(Value::Int(decoder.read_int()?)),
            Schema::Long => Ok(Value::Long(decoder.read_long()?)),
            Schema::Float => Ok(Value::Float(decoder.read_float()?)),
            Schema::Double => Ok(Value::Double(decoder.read_double()?)),
            Schema::Bytes => Ok(Value::Bytes(decoder.read_bytes()?)),
            Schema::String => {
                let s = decoder.read_string()?;
                match self.model.string_representation {
                    StringRepresentation::Native => Ok(Value::String(s)),
                    StringRepresentation::Utf8Bytes => Ok(Value::Bytes(s.into_bytes())),
                }
            }
            Schema::Fixed(f) => Ok(Value::Fixed(decoder.read_fixed(f.size)?)),

            Schema::Enum(e) => {
                let ordinal = decoder.read_enum()?;
                let symbol = e.symbols.get(ordinal).cloned().ok_or_else(|| {
                    CodecError::Malformed(format!(
                        "enum ordinal {} out of range for '{}' with {} symbols",
                        ordinal,
                        e.name,
                        e.symbols.len()
                    ))
                })?;
                Ok(Value::Enum(ordinal as u32, symbol))
            }

            Schema::Array(items) => {
                let mut out = match reuse {
                    Some(Value::Array(mut v)) => {
                        v.clear();
                        v
                    }
                    _ => Vec::new(),
                };
                let mut n = decoder.read_array_start()?;
                while n != 0 {
                    out.reserve(n.min(1 << 16) as usize);
                    for _ in 0..n {
                        out.push(self.read_value(None, items, decoder)?);
                    }
                    n = decoder.array_next()?;
                }
                Ok(Value::Array(out))
            }

            Schema::Map(values) => {
                let mut out = match reuse {
                    Some(Value::Map(mut v)) => {
                        v.clear();
                        v
                    }
                    _ => Vec::new(),
                };
                let mut n = decoder.read_map_start()?;
                while n != 0 {
                    out.reserve(n.min(1 << 16) as usize);
                    for _ in 0..n {
                        let key = decoder.read_string()?;
                        let value = self.read_value(None, values, decoder)?;
                        out.push((key, value));
                    }
                    n = decoder.map_next()?;
                }
                Ok(Value::Map(out))
            }

            Schema::Union(branches) => {
                let index = decoder.read_index()?;
                let branch = branches.get(index).ok_or_else(|| {
                    CodecError::UnionBranch(format!(
                        "union index {} out of range (0..{})",
                        index,
                        branches.len()
                    ))
                })?;
                let inner = self.read_value(None, branch, decoder)?;
                Ok(Value::Union(index, Box::new(inner)))
            }

            Schema::Record(r) => {
                let mut old_fields = match reuse {
                    Some(Value::Record(fields)) => fields,
                    _ => Vec::new(),
                };
                let take_old = |old: &mut Vec<(String, Value)>, name: &str| -> Option<Value> {
                    old.iter()
                        .position(|(n, _)| n == name)
                        .map(|i| old.swap_remove(i).1)
                };

                match decoder.read_field_order()? {
                    // A resolving decoder dictates the decode order;
                    // values land at their reader positions
                    Some(bindings) => {
                        let mut slots: Vec<Option<Value>> = vec![None; r.fields.len()];
                        for binding in &bindings {
                            let field = r.fields.get(binding.position).ok_or_else(|| {
                                CodecError::Malformed(format!(
                                    "field position {} out of range",
                                    binding.position
                                ))
                            })?;
                            let old = take_old(&mut old_fields, &field.name);
                            slots[binding.position] =
                                Some(self.read_value(old, &field.schema, decoder)?);
                        }
                        let mut fields = Vec::with_capacity(r.fields.len());
                        for (field, slot) in r.fields.iter().zip(slots) {
                            let value = slot.ok_or_else(|| {
                                CodecError::MissingField(field.name.clone())
                            })?;
                            fields.push((field.name.clone(), value));
                        }
                        Ok(Value::Record(fields))
                    }
                    // Plain decoders surface fields in declaration order
                    None => {
                        let mut fields = Vec::with_capacity(r.fields.len());
                        for field in &r.fields {
                            let old = take_old(&mut old_fields, &field.name);
                            let value = self.read_value(old, &field.schema, decoder)?;
                            fields.push((field.name.clone(), value));
                        }
                        Ok(Value::Record(fields))
                    }
                }
            }

            // Stripped above
            Schema::Named(name) => Err(CodecError::UnresolvedSchema(name.clone())),
            Schema::Logical(_) => unreachable!("logical bindings stripped above"),
        }
    }
}
