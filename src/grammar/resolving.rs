//! Resolution grammar compilation.
//!
//! Fuses a writer schema and a reader schema into one grammar whose
//! terminals follow the writer's wire order while its actions surface
//! reader-shaped values: primitive promotion, field matching by name or
//! reader alias, writer-only field skipping, reader-default injection
//! with the default pre-encoded to binary, enum ordinal remapping, and
//! union branch adjustment.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::binary::BinaryEncoder;
use crate::codec::{Encoder, FieldBinding};
use crate::error::CodecError;
use crate::grammar::{
    binary::generate_into, Action, CompiledGrammar, EnumMapping, Grammar, Symbol, SymbolId,
    Terminal,
};
use crate::schema::{Schema, SchemaContext};

/// Compile the resolution grammar for a writer/reader pair.
pub fn resolving_grammar(writer: &Schema, reader: &Schema) -> Result<CompiledGrammar, CodecError> {
    let writer_context = SchemaContext::from_schema(writer);
    let reader_context = SchemaContext::from_schema(reader);
    let mut grammar = Grammar::new();
    let mut gen = ResolvingGen {
        grammar: &mut grammar,
        writer_context: &writer_context,
        reader_context: &reader_context,
        memo: HashMap::new(),
    };
    let datum = gen.generate(writer, reader)?;
    let root = grammar.root(datum);
    Ok(CompiledGrammar {
        grammar: std::sync::Arc::new(grammar),
        root,
    })
}

struct ResolvingGen<'a> {
    grammar: &'a mut Grammar,
    writer_context: &'a SchemaContext,
    reader_context: &'a SchemaContext,
    /// Forwarding symbols keyed by the (writer, reader) fullname pair,
    /// inserted before recursion so cyclic records stay finite
    memo: HashMap<(String, String), SymbolId>,
}

impl ResolvingGen<'_> {
    fn generate(&mut self, writer: &Schema, reader: &Schema) -> Result<SymbolId, CodecError> {
        let writer = self.resolve_refs(writer, true)?;
        let reader = self.resolve_refs(reader, false)?;

        // The writer's union index is consumed before anything the reader
        // sees, so unions on the writer side come first
        if let Schema::Union(wbranches) = &writer {
            return self.generate_writer_union(wbranches, &reader);
        }

        match (&writer, &reader) {
            (Schema::Null, Schema::Null) => Ok(self.grammar.terminal(Terminal::Null)),
            (Schema::Boolean, Schema::Boolean) => Ok(self.grammar.terminal(Terminal::Boolean)),
            (Schema::Int, Schema::Int) => Ok(self.grammar.terminal(Terminal::Int)),
            (Schema::Long, Schema::Long) => Ok(self.grammar.terminal(Terminal::Long)),
            (Schema::Float, Schema::Float) => Ok(self.grammar.terminal(Terminal::Float)),
            (Schema::Double, Schema::Double) => Ok(self.grammar.terminal(Terminal::Double)),
            (Schema::Bytes, Schema::Bytes) => Ok(self.grammar.terminal(Terminal::Bytes)),
            (Schema::String, Schema::String) => Ok(self.grammar.terminal(Terminal::String)),

            (Schema::Array(witems), Schema::Array(ritems)) => {
                let item = self.generate(witems, ritems)?;
                let rep = self.grammar.repeat(Terminal::ArrayEnd, vec![item]);
                let start = self.grammar.terminal(Terminal::ArrayStart);
                Ok(self.grammar.seq(vec![start, rep]))
            }

            (Schema::Map(wvalues), Schema::Map(rvalues)) => {
                let key = self.grammar.terminal(Terminal::String);
                let value = self.generate(wvalues, rvalues)?;
                let rep = self.grammar.repeat(Terminal::MapEnd, vec![key, value]);
                let start = self.grammar.terminal(Terminal::MapStart);
                Ok(self.grammar.seq(vec![start, rep]))
            }

            (Schema::Record(w), Schema::Record(r)) => self.generate_record(&writer, w, r),

            (Schema::Enum(w), Schema::Enum(r)) => {
                if !names_match(&writer, &reader) {
                    return Err(incompatible(&writer, &reader));
                }
                let mapping = w
                    .symbols
                    .iter()
                    .map(|ws| match r.symbol_index(ws) {
                        Some(ordinal) => EnumMapping::Ordinal(ordinal),
                        None => match &r.default {
                            Some(d) => match r.symbol_index(d) {
                                Some(ordinal) => EnumMapping::Ordinal(ordinal),
                                None => EnumMapping::Unmatched(format!(
                                    "enum default '{}' is not a reader symbol",
                                    d
                                )),
                            },
                            None => EnumMapping::Unmatched(format!(
                                "writer enum symbol '{}' has no reader counterpart",
                                ws
                            )),
                        },
                    })
                    .collect();
                let adjust = self.grammar.action(Action::EnumAdjust { mapping });
                let term = self.grammar.terminal(Terminal::Enum);
                Ok(self.grammar.seq(vec![term, adjust]))
            }

            (Schema::Fixed(w), Schema::Fixed(r)) => {
                if !names_match(&writer, &reader) {
                    return Err(incompatible(&writer, &reader));
                }
                if w.size != r.size {
                    return Err(CodecError::type_mismatch(
                        format!("fixed {} of size {}", r.fullname(), r.size),
                        format!("fixed {} of size {}", w.fullname(), w.size),
                    ));
                }
                let check = self.grammar.action(Action::SizeCheck(w.size));
                let fixed = self.grammar.terminal(Terminal::Fixed);
                Ok(self.grammar.seq(vec![fixed, check]))
            }

            // Reader-side union over a non-union writer
            (_, Schema::Union(rbranches)) => self.generate_reader_union(&writer, rbranches),

            // Primitive promotion
            _ => match promotion(&writer, &reader) {
                Some((wt, rt)) => Ok(self.grammar.action(Action::Promote {
                    writer: wt,
                    reader: rt,
                })),
                None => Err(incompatible(&writer, &reader)),
            },
        }
    }

    /// Strip logical bindings and follow named references.
    fn resolve_refs(&self, schema: &Schema, writer_side: bool) -> Result<Schema, CodecError> {
        let context = if writer_side {
            self.writer_context
        } else {
            self.reader_context
        };
        let mut current = schema;
        loop {
            match current {
                Schema::Logical(l) => current = l.base.as_ref(),
                Schema::Named(_) => current = context.deref(current)?,
                _ => return Ok(current.clone()),
            }
        }
    }

    fn generate_writer_union(
        &mut self,
        wbranches: &[Schema],
        reader: &Schema,
    ) -> Result<SymbolId, CodecError> {
        let mut labels = Vec::with_capacity(wbranches.len());
        let mut symbols = Vec::with_capacity(wbranches.len());
        for wb in wbranches {
            labels.push(wb.branch_label());
            // A branch the reader cannot accept only fails when the wire
            // actually takes it
            let sym = match self.generate(wb, reader) {
                Ok(sym) => sym,
                Err(err) => self.grammar.action(Action::Error(err.to_string())),
            };
            symbols.push(sym);
        }
        let alt = self.grammar.alt(labels, symbols);
        let writer_union = self.grammar.action(Action::WriterUnion);
        Ok(self.grammar.seq(vec![writer_union, alt]))
    }

    fn generate_reader_union(
        &mut self,
        writer: &Schema,
        rbranches: &[Schema],
    ) -> Result<SymbolId, CodecError> {
        let index = best_branch(writer, rbranches, self.reader_context)?;
        let symbol = self.generate(writer, &rbranches[index])?;
        let adjust = self.grammar.action(Action::UnionAdjust {
            reader_index: index,
            symbol,
        });
        let union = self.grammar.terminal(Terminal::Union);
        Ok(self.grammar.seq(vec![union, adjust]))
    }

    fn generate_record(
        &mut self,
        writer: &Schema,
        w: &crate::schema::RecordSchema,
        r: &crate::schema::RecordSchema,
    ) -> Result<SymbolId, CodecError> {
        if !named_accepts(&w.fullname(), &w.name, &r.fullname(), &r.name, &r.aliases) {
            return Err(CodecError::type_mismatch(
                format!("record {}", r.fullname()),
                format!("record {}", w.fullname()),
            ));
        }

        let memo_key = (w.fullname(), r.fullname());
        if let Some(&forward) = self.memo.get(&memo_key) {
            return Ok(forward);
        }
        let forward = self.grammar.placeholder();
        self.memo.insert(memo_key, forward);

        // Match reader fields to writer fields by name or reader alias
        let mut reader_for_writer: Vec<Option<usize>> = vec![None; w.fields.len()];
        let mut writer_for_reader: Vec<Option<usize>> = vec![None; r.fields.len()];
        for (ri, rf) in r.fields.iter().enumerate() {
            let hit = w
                .fields
                .iter()
                .position(|wf| wf.name == rf.name)
                .or_else(|| {
                    rf.aliases
                        .iter()
                        .find_map(|alias| w.fields.iter().position(|wf| &wf.name == alias))
                });
            if let Some(wi) = hit {
                reader_for_writer[wi] = Some(ri);
                writer_for_reader[ri] = Some(wi);
            }
        }

        let mut bindings = Vec::with_capacity(r.fields.len());
        let mut exec = Vec::new();

        // Writer fields in writer order: read or skip
        for (wi, wf) in w.fields.iter().enumerate() {
            match reader_for_writer[wi] {
                Some(ri) => {
                    let rf = &r.fields[ri];
                    bindings.push(FieldBinding {
                        name: rf.name.clone(),
                        position: rf.position,
                    });
                    let adjust = self.grammar.action(Action::FieldAdjust {
                        fname: rf.name.clone(),
                        position: rf.position,
                        default: None,
                    });
                    exec.push(adjust);
                    exec.push(self.generate(&wf.schema, &rf.schema)?);
                }
                None => {
                    let to_skip = generate_into(self.grammar, self.writer_context, &wf.schema)
                        .map_err(CodecError::from)?;
                    let skip = self.grammar.action(Action::Skip { symbol: to_skip });
                    exec.push(skip);
                }
            }
        }

        // Reader fields absent from the writer: inject defaults
        for (ri, rf) in r.fields.iter().enumerate() {
            if writer_for_reader[ri].is_some() {
                continue;
            }
            let Some(default) = &rf.default else {
                return Err(CodecError::MissingField(rf.name.clone()));
            };
            bindings.push(FieldBinding {
                name: rf.name.clone(),
                position: rf.position,
            });
            let mut enc = BinaryEncoder::new();
            encode_default(&mut enc, &rf.schema, default, self.reader_context)?;
            let start = self.grammar.action(Action::DefaultStart {
                bytes: enc.into_bytes(),
            });
            exec.push(start);
            exec.push(self.generate(&rf.schema, &rf.schema)?);
            exec.push(self.grammar.action(Action::DefaultEnd));
        }

        let order = self.grammar.action(Action::FieldOrder { fields: bindings });
        let mut full_exec = Vec::with_capacity(exec.len() + 1);
        full_exec.push(order);
        full_exec.extend(exec);

        full_exec.reverse();
        self.grammar.patch(forward, Symbol::Sequence(full_exec));
        Ok(forward)
    }
}

/// Whether the reader accepts the writer's name: equal fullnames, the
/// writer's name among the reader's aliases, or equal simple names.
fn named_accepts(
    wfull: &str,
    wname: &str,
    rfull: &str,
    rname: &str,
    raliases: &[String],
) -> bool {
    wfull == rfull || raliases.iter().any(|a| a == wfull || a == wname) || wname == rname
}

/// Alias-aware name check for two named schemas.
fn names_match(writer: &Schema, reader: &Schema) -> bool {
    let (Some(wfull), Some(rfull)) = (writer.fullname(), reader.fullname()) else {
        return false;
    };
    let wname = writer.name().unwrap_or_default();
    let rname = reader.name().unwrap_or_default();
    named_accepts(&wfull, wname, &rfull, rname, reader.aliases())
}

/// The accepted primitive promotions, as writer/reader terminal pairs.
fn promotion(writer: &Schema, reader: &Schema) -> Option<(Terminal, Terminal)> {
    match (writer, reader) {
        (Schema::Int, Schema::Long) => Some((Terminal::Int, Terminal::Long)),
        (Schema::Int, Schema::Float) => Some((Terminal::Int, Terminal::Float)),
        (Schema::Int, Schema::Double) => Some((Terminal::Int, Terminal::Double)),
        (Schema::Long, Schema::Float) => Some((Terminal::Long, Terminal::Float)),
        (Schema::Long, Schema::Double) => Some((Terminal::Long, Terminal::Double)),
        (Schema::Float, Schema::Double) => Some((Terminal::Float, Terminal::Double)),
        (Schema::String, Schema::Bytes) => Some((Terminal::String, Terminal::Bytes)),
        (Schema::Bytes, Schema::String) => Some((Terminal::Bytes, Terminal::String)),
        _ => None,
    }
}

/// Pick the reader union branch for a non-union writer: exact structural
/// match first, then the first branch a promotion reaches.
fn best_branch(
    writer: &Schema,
    rbranches: &[Schema],
    reader_context: &SchemaContext,
) -> Result<usize, CodecError> {
    // First pass: same shape
    for (i, rb) in rbranches.iter().enumerate() {
        let rb = reader_context.deref(rb).map_err(CodecError::from)?;
        let rb = rb.base();
        let same = match (writer, rb) {
            (Schema::Record(_), Schema::Record(_))
            | (Schema::Enum(_), Schema::Enum(_))
            | (Schema::Fixed(_), Schema::Fixed(_)) => names_match(writer, rb),
            _ => std::mem::discriminant(writer) == std::mem::discriminant(rb),
        };
        if same {
            return Ok(i);
        }
    }
    // Second pass: promotable
    for (i, rb) in rbranches.iter().enumerate() {
        let rb = reader_context.deref(rb).map_err(CodecError::from)?;
        if promotion(writer, rb.base()).is_some() {
            return Ok(i);
        }
    }
    Err(CodecError::UnionBranch(format!(
        "no reader union branch accepts writer type {}",
        writer.branch_label()
    )))
}

fn incompatible(writer: &Schema, reader: &Schema) -> CodecError {
    CodecError::type_mismatch(reader.branch_label(), writer.branch_label())
}

/// Binary-encode a field default straight from its JSON form.
///
/// Default JSON follows the schema-document conventions: bytes and fixed
/// as ISO-8859-1 strings, enums as symbol names, unions as a value of
/// their first branch.
fn encode_default(
    enc: &mut BinaryEncoder,
    schema: &Schema,
    json: &JsonValue,
    context: &SchemaContext,
) -> Result<(), CodecError> {
    let mut schema = schema;
    loop {
        match schema {
            Schema::Logical(l) => schema = l.base.as_ref(),
            Schema::Named(_) => schema = context.deref(schema).map_err(CodecError::from)?,
            _ => break,
        }
    }
    match (schema, json) {
        (Schema::Null, JsonValue::Null) => enc.write_null(),
        (Schema::Boolean, JsonValue::Bool(b)) => enc.write_boolean(*b),
        (Schema::Int, JsonValue::Number(n)) => {
            let v = n
                .as_i64()
                .ok_or_else(|| bad_default(json, "int"))?;
            enc.write_int(v as i32)
        }
        (Schema::Long, JsonValue::Number(n)) => {
            let v = n
                .as_i64()
                .ok_or_else(|| bad_default(json, "long"))?;
            enc.write_long(v)
        }
        (Schema::Float, JsonValue::Number(n)) => {
            let v = n
                .as_f64()
                .ok_or_else(|| bad_default(json, "float"))?;
            enc.write_float(v as f32)
        }
        (Schema::Double, JsonValue::Number(n)) => {
            let v = n
                .as_f64()
                .ok_or_else(|| bad_default(json, "double"))?;
            enc.write_double(v)
        }
        (Schema::String, JsonValue::String(s)) => enc.write_string(s),
        (Schema::Bytes, JsonValue::String(s)) => enc.write_bytes(&latin1_bytes(s)?),
        (Schema::Fixed(f), JsonValue::String(s)) => {
            let bytes = latin1_bytes(s)?;
            if bytes.len() != f.size {
                return Err(CodecError::Malformed(format!(
                    "fixed default has {} bytes, schema wants {}",
                    bytes.len(),
                    f.size
                )));
            }
            enc.write_fixed(&bytes)
        }
        (Schema::Enum(e), JsonValue::String(s)) => {
            let ordinal = e
                .symbol_index(s)
                .ok_or_else(|| bad_default(json, "enum symbol"))?;
            enc.write_enum(ordinal)
        }
        (Schema::Array(items), JsonValue::Array(arr)) => {
            enc.write_array_start()?;
            enc.set_item_count(arr.len() as u64)?;
            for item in arr {
                enc.start_item()?;
                encode_default(enc, items, item, context)?;
            }
            enc.write_array_end()
        }
        (Schema::Map(values), JsonValue::Object(obj)) => {
            enc.write_map_start()?;
            enc.set_item_count(obj.len() as u64)?;
            for (key, value) in obj {
                enc.start_item()?;
                enc.write_string(key)?;
                encode_default(enc, values, value, context)?;
            }
            enc.write_map_end()
        }
        (Schema::Record(r), JsonValue::Object(obj)) => {
            for field in &r.fields {
                let value = obj
                    .get(&field.name)
                    .or(field.default.as_ref())
                    .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                encode_default(enc, &field.schema, value, context)?;
            }
            Ok(())
        }
        // Union defaults are values of the first branch
        (Schema::Union(branches), json) => {
            let first = branches
                .first()
                .ok_or_else(|| CodecError::Malformed("empty union".to_string()))?;
            enc.write_index(0)?;
            encode_default(enc, first, json, context)
        }
        _ => Err(bad_default(json, schema.branch_label().as_str())),
    }
}

fn bad_default(json: &JsonValue, expected: &str) -> CodecError {
    CodecError::Malformed(format!(
        "default value {} is not valid for {}",
        json, expected
    ))
}

/// JSON strings holding byte data map each char to one byte.
fn latin1_bytes(s: &str) -> Result<Vec<u8>, CodecError> {
    s.chars()
        .map(|c| {
            u8::try_from(c as u32).map_err(|_| {
                CodecError::Malformed(format!("byte string holds non-latin1 char {:?}", c))
            })
        })
        .collect()
}
