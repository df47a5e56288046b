//! Extended JSON encoder.
//!
//! The write-side inverse of the extended decoder, driven by the same
//! grammar. Fields always emit in declaration order; nullable
//! single-branch unions emit unwrapped, other unions as a single-member
//! object tagged with the branch label.

use std::str::FromStr;
use std::sync::Arc;

use num_bigint::BigInt;
use serde_json::{Map, Number, Value as JsonValue};

use crate::codec::{Encoder, JsonExtensionEncoder};
use crate::error::CodecError;
use crate::grammar::{
    json_grammar, Action, ActionHandler, Grammar, Marker, Outcome, Parser, Symbol, SymbolId,
    Terminal,
};
use crate::schema::{Schema, SchemaContext};
use crate::value::Decimal;

/// One level of JSON output being assembled.
#[derive(Debug)]
enum Frame {
    Root(Option<JsonValue>),
    Object {
        members: Map<String, JsonValue>,
        pending_key: Option<String>,
    },
    Array(Vec<JsonValue>),
}

/// Stack machine assembling the output value.
#[derive(Debug)]
struct ValueBuilder {
    frames: Vec<Frame>,
}

impl ValueBuilder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::Root(None)],
        }
    }

    fn emit(&mut self, value: JsonValue) -> Result<(), CodecError> {
        match self.frames.last_mut() {
            Some(Frame::Root(slot @ None)) => {
                *slot = Some(value);
                Ok(())
            }
            Some(Frame::Object {
                members,
                pending_key,
            }) => {
                let key = pending_key.take().ok_or_else(|| {
                    CodecError::Malformed("value emitted without a member key".to_string())
                })?;
                members.insert(key, value);
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            _ => Err(CodecError::Malformed(
                "value emitted after the datum completed".to_string(),
            )),
        }
    }

    fn begin_object(&mut self) {
        self.frames.push(Frame::Object {
            members: Map::new(),
            pending_key: None,
        });
    }

    fn member_key(&mut self, key: String) -> Result<(), CodecError> {
        match self.frames.last_mut() {
            Some(Frame::Object { pending_key, .. }) => {
                *pending_key = Some(key);
                Ok(())
            }
            _ => Err(CodecError::Malformed(
                "member key emitted outside an object".to_string(),
            )),
        }
    }

    fn end_object(&mut self) -> Result<(), CodecError> {
        match self.frames.pop() {
            Some(Frame::Object { members, .. }) => self.emit(JsonValue::Object(members)),
            _ => Err(CodecError::Malformed(
                "object closed while none was open".to_string(),
            )),
        }
    }

    fn begin_array(&mut self) {
        self.frames.push(Frame::Array(Vec::new()));
    }

    fn end_array(&mut self) -> Result<(), CodecError> {
        match self.frames.pop() {
            Some(Frame::Array(items)) => self.emit(JsonValue::Array(items)),
            _ => Err(CodecError::Malformed(
                "array closed while none was open".to_string(),
            )),
        }
    }

    fn finish(mut self) -> Result<JsonValue, CodecError> {
        match self.frames.pop() {
            Some(Frame::Root(Some(value))) if self.frames.is_empty() => Ok(value),
            _ => Err(CodecError::Malformed(
                "datum incomplete at finish".to_string(),
            )),
        }
    }
}

struct JsonWriteState {
    grammar: Arc<Grammar>,
    out: ValueBuilder,
}

impl ActionHandler for JsonWriteState {
    fn do_action(
        &mut self,
        _input: Option<SymbolId>,
        top: SymbolId,
    ) -> Result<Outcome, CodecError> {
        let grammar = self.grammar.clone();
        let action = match grammar.symbol(top) {
            Symbol::Action(a) => a,
            other => {
                return Err(CodecError::Malformed(format!(
                    "action expected on stack, found {:?}",
                    other
                )))
            }
        };
        match action {
            Action::Structural(Marker::RecordStart) => {
                self.out.begin_object();
                Ok(Outcome::Continue)
            }
            Action::Structural(Marker::RecordEnd | Marker::UnionEnd) => {
                self.out.end_object()?;
                Ok(Outcome::Continue)
            }
            Action::Structural(Marker::FieldEnd) => Ok(Outcome::Continue),
            Action::FieldAdjust { fname, .. } => {
                self.out.member_key(fname.clone())?;
                Ok(Outcome::Continue)
            }
            _ => Ok(Outcome::Continue),
        }
    }
}

/// Grammar-driven JSON encoder.
pub struct JsonEncoder {
    parser: Parser,
    state: JsonWriteState,
    context: SchemaContext,
    /// Whether the current array/map level has emitted an item yet
    item_written: Vec<bool>,
}

impl JsonEncoder {
    /// Create an encoder for `schema`.
    pub fn new(schema: &Schema) -> Result<Self, CodecError> {
        let compiled = json_grammar(schema).map_err(CodecError::from)?;
        let parser = Parser::new(compiled.grammar.clone(), compiled.root);
        Ok(Self {
            parser,
            state: JsonWriteState {
                grammar: compiled.grammar,
                out: ValueBuilder::new(),
            },
            context: SchemaContext::from_schema(schema),
            item_written: Vec::new(),
        })
    }

    fn advance(&mut self, t: Terminal) -> Result<SymbolId, CodecError> {
        let input = self.parser.term(t);
        self.parser.advance(input, &mut self.state)
    }

    /// Finish the datum and take the assembled JSON value.
    pub fn into_value(mut self) -> Result<JsonValue, CodecError> {
        // Fire any structural closers still pending above the root
        self.parser.process_implicit_actions(&mut self.state)?;
        self.state.out.finish()
    }

    /// Finish the datum and render it as a JSON string.
    pub fn into_string(self) -> Result<String, CodecError> {
        let value = self.into_value()?;
        serde_json::to_string(&value)
            .map_err(|e| CodecError::Malformed(format!("JSON render failed: {}", e)))
    }

    fn pop_size_check(&mut self) -> Result<usize, CodecError> {
        let check = self.parser.pop_symbol();
        match self.parser.action_of(check) {
            Some(Action::SizeCheck(n)) => Ok(*n),
            other => Err(CodecError::Malformed(format!(
                "size check missing from grammar: {:?}",
                other
            ))),
        }
    }

    fn emit_number(&mut self, n: Number) -> Result<(), CodecError> {
        self.state.out.emit(JsonValue::Number(n))
    }

    /// Synchronize on a primitive-shaped schema before an extension
    /// write.
    fn advance_by(&mut self, schema: &Schema) -> Result<(), CodecError> {
        match schema.base() {
            Schema::Bytes => self.advance(Terminal::Bytes).map(|_| ()),
            Schema::String => self.advance(Terminal::String).map(|_| ()),
            Schema::Long => self.advance(Terminal::Long).map(|_| ()),
            Schema::Int => self.advance(Terminal::Int).map(|_| ()),
            Schema::Double => self.advance(Terminal::Double).map(|_| ()),
            Schema::Float => self.advance(Terminal::Float).map(|_| ()),
            Schema::Fixed(_) => {
                self.advance(Terminal::Fixed)?;
                self.pop_size_check()?;
                Ok(())
            }
            other => Err(CodecError::Malformed(format!(
                "extension write unsupported for {} schema",
                other.branch_label()
            ))),
        }
    }

    /// Grammar-synchronized write of a raw JSON tree shaped by `schema`.
    fn write_tree(&mut self, value: &JsonValue, schema: &Schema) -> Result<(), CodecError> {
        let schema = self
            .context
            .deref(schema)
            .map_err(CodecError::from)?
            .clone();
        match (schema.base(), value) {
            (Schema::Null, JsonValue::Null) => self.write_null(),
            (Schema::Boolean, JsonValue::Bool(b)) => self.write_boolean(*b),
            (Schema::Int, JsonValue::Number(n)) => {
                self.write_int(n.as_i64().unwrap_or_default() as i32)
            }
            (Schema::Long, JsonValue::Number(n)) => {
                self.write_long(n.as_i64().unwrap_or_default())
            }
            (Schema::Float, JsonValue::Number(n)) => {
                self.write_float(n.as_f64().unwrap_or_default() as f32)
            }
            (Schema::Double, JsonValue::Number(n)) => {
                self.write_double(n.as_f64().unwrap_or_default())
            }
            (Schema::String, JsonValue::String(s)) => self.write_string(s),
            (Schema::Bytes, any) => {
                // Raw JSON may sit where bytes are declared
                self.advance(Terminal::Bytes)?;
                self.state.out.emit(any.clone())
            }
            (Schema::Record(r), JsonValue::Object(members)) => {
                let fields: Vec<_> = r.fields.clone();
                for field in &fields {
                    let member = members
                        .get(&field.name)
                        .or(field.default.as_ref())
                        .ok_or_else(|| CodecError::MissingField(field.name.clone()))?
                        .clone();
                    self.write_tree(&member, &field.schema)?;
                }
                Ok(())
            }
            (schema, value) => Err(CodecError::Malformed(format!(
                "cannot project JSON {} into {} schema",
                value,
                schema.branch_label()
            ))),
        }
    }
}

impl Encoder for JsonEncoder {
    fn write_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        self.state.out.emit(JsonValue::Null)
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), CodecError> {
        self.advance(Terminal::Boolean)?;
        self.state.out.emit(JsonValue::Bool(value))
    }

    fn write_int(&mut self, value: i32) -> Result<(), CodecError> {
        self.advance(Terminal::Int)?;
        self.emit_number(value.into())
    }

    fn write_long(&mut self, value: i64) -> Result<(), CodecError> {
        self.advance(Terminal::Long)?;
        self.emit_number(value.into())
    }

    fn write_float(&mut self, value: f32) -> Result<(), CodecError> {
        self.advance(Terminal::Float)?;
        let n = Number::from_f64(value as f64)
            .ok_or_else(|| CodecError::Malformed("non-finite float".to_string()))?;
        self.emit_number(n)
    }

    fn write_double(&mut self, value: f64) -> Result<(), CodecError> {
        self.advance(Terminal::Double)?;
        let n = Number::from_f64(value)
            .ok_or_else(|| CodecError::Malformed("non-finite double".to_string()))?;
        self.emit_number(n)
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Bytes)?;
        let s: String = value.iter().map(|&b| b as char).collect();
        self.state.out.emit(JsonValue::String(s))
    }

    fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.advance(Terminal::String)?;
        if self.parser.top_is(Terminal::MapKeyMarker) {
            self.advance(Terminal::MapKeyMarker)?;
            return self.state.out.member_key(value.to_string());
        }
        self.state.out.emit(JsonValue::String(value.to_string()))
    }

    fn write_fixed(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.advance(Terminal::Fixed)?;
        let size = self.pop_size_check()?;
        if value.len() != size {
            return Err(CodecError::Malformed(format!(
                "fixed value has {} bytes, schema wants {}",
                value.len(),
                size
            )));
        }
        let s: String = value.iter().map(|&b| b as char).collect();
        self.state.out.emit(JsonValue::String(s))
    }

    fn write_enum(&mut self, ordinal: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Enum)?;
        let labels = self.parser.pop_symbol();
        let symbol = match self.parser.action_of(labels) {
            Some(Action::EnumLabels(labels)) => labels.get(ordinal).cloned(),
            other => {
                return Err(CodecError::Malformed(format!(
                    "enum labels missing from grammar: {:?}",
                    other
                )))
            }
        };
        let symbol = symbol.ok_or_else(|| {
            CodecError::Malformed(format!("enum ordinal {} out of range", ordinal))
        })?;
        self.state.out.emit(JsonValue::String(symbol))
    }

    fn write_index(&mut self, index: usize) -> Result<(), CodecError> {
        self.advance(Terminal::Union)?;
        let alt = self.parser.pop_symbol();
        let (labels, branches) = match self.parser.grammar().symbol(alt) {
            Symbol::Alternative { labels, branches } => (labels.clone(), branches.clone()),
            other => {
                return Err(CodecError::Malformed(format!(
                    "union alternative missing from grammar: {:?}",
                    other
                )))
            }
        };
        let label = labels.get(index).ok_or_else(|| {
            CodecError::UnionBranch(format!("union index {} out of range", index))
        })?;
        let branch = branches[index];

        let unwrapped = label == "null" || labels.len() == 2 && labels.iter().any(|l| l == "null");
        if unwrapped {
            self.parser.push_symbol(branch);
            return Ok(());
        }

        self.state.out.begin_object();
        self.state.out.member_key(label.clone())?;
        self.parser
            .push_symbol(self.state.grammar.marker(Marker::UnionEnd));
        self.parser.push_symbol(branch);
        Ok(())
    }

    fn write_array_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::ArrayStart)?;
        self.state.out.begin_array();
        self.item_written.push(false);
        Ok(())
    }

    fn set_item_count(&mut self, _count: u64) -> Result<(), CodecError> {
        Ok(())
    }

    fn start_item(&mut self) -> Result<(), CodecError> {
        // Every item after the first closes the previous one first
        let Some(&was_written) = self.item_written.last() else {
            return Err(CodecError::Malformed(
                "item started outside an array or map".to_string(),
            ));
        };
        if was_written {
            self.advance(Terminal::ItemEnd)?;
        } else if let Some(written) = self.item_written.last_mut() {
            *written = true;
        }
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<(), CodecError> {
        if self.item_written.pop() == Some(true) {
            self.advance(Terminal::ItemEnd)?;
        }
        self.advance(Terminal::ArrayEnd)?;
        self.state.out.end_array()
    }

    fn write_map_start(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::MapStart)?;
        self.state.out.begin_object();
        self.item_written.push(false);
        Ok(())
    }

    fn write_map_end(&mut self) -> Result<(), CodecError> {
        if self.item_written.pop() == Some(true) {
            self.advance(Terminal::ItemEnd)?;
        }
        self.advance(Terminal::MapEnd)?;
        self.state.out.end_object()
    }

    fn json_extension(&mut self) -> Option<&mut dyn JsonExtensionEncoder> {
        Some(self)
    }
}

impl JsonExtensionEncoder for JsonEncoder {
    fn write_decimal(&mut self, value: &Decimal, schema: &Schema) -> Result<(), CodecError> {
        self.advance_by(schema)?;
        let text = value.to_string();
        match Number::from_str(&text) {
            Ok(n) => self.state.out.emit(JsonValue::Number(n)),
            // Out of double range: fall back to the string form readers
            // also accept
            Err(_) => self.state.out.emit(JsonValue::String(text)),
        }
    }

    fn write_big_integer(&mut self, value: &BigInt, schema: &Schema) -> Result<(), CodecError> {
        self.advance_by(schema)?;
        let text = value.to_string();
        match Number::from_str(&text) {
            Ok(n) => self.state.out.emit(JsonValue::Number(n)),
            Err(_) => self.state.out.emit(JsonValue::String(text)),
        }
    }

    fn write_json_value(&mut self, value: &JsonValue, schema: &Schema) -> Result<(), CodecError> {
        self.write_tree(value, schema)
    }
}
