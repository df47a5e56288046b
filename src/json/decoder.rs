//! Extended JSON decoder.
//!
//! Grammar-driven, field-order-agnostic JSON decoding with reader-default
//! injection and lenient tolerance for unknown trailing fields. Record
//! fields may arrive in any order: while hunting for the expected field
//! the decoder captures every other field's subtree into a reorder buffer
//! and replays it when that field's turn comes. Missing fields materialize
//! their schema default as a substitute input.

use std::str::FromStr;
use std::sync::Arc;

use num_bigint::BigInt;
use serde_json::Value as JsonValue;

use crate::codec::{Decoder, JsonExtensionDecoder};
use crate::error::CodecError;
use crate::grammar::{
    json_grammar, Action, ActionHandler, Grammar, Marker, Outcome, Parser, Symbol, SymbolId,
    Terminal,
};
use crate::json::tokens::{detokenize, tokenize, JsonToken, TokenCursor};
use crate::schema::{Schema, SchemaContext};
use crate::value::Decimal;

/// Nesting bound for out-of-order field captures.
const FIELD_CAPTURE_DEPTH: usize = 8;
/// Nesting bound for materialized defaults.
const DEFAULT_CAPTURE_DEPTH: usize = 2;

/// Per-record scratch holding out-of-order field subtrees until their
/// reader-side turn.
#[derive(Debug, Default)]
struct ReorderBuffer {
    saved_fields: Vec<(String, Vec<JsonToken>)>,
    /// The outer cursor to restore at field end, when input was
    /// redirected into a capture or a default
    orig_input: Option<TokenCursor>,
}

/// Handler state: token input plus the reorder machinery.
struct JsonState {
    grammar: Arc<Grammar>,
    input: TokenCursor,
    reorder_buffers: Vec<Option<ReorderBuffer>>,
    current_buffer: Option<ReorderBuffer>,
    lenient: bool,
}

impl JsonState {
    fn token_err(&self, expected: &str) -> CodecError {
        let found = self
            .input
            .current()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of input".to_string());
        CodecError::type_mismatch(expected, found)
    }

    /// Close the current record scope: leftover captured fields are an
    /// error in strict mode and dropped in lenient mode.
    fn finish_record(&mut self) -> Result<(), CodecError> {
        if let Some(buffer) = &self.current_buffer {
            if !buffer.saved_fields.is_empty() && !self.lenient {
                let names: Vec<&str> = buffer
                    .saved_fields
                    .iter()
                    .map(|(n, _)| n.as_str())
                    .collect();
                return Err(CodecError::UnknownField(names.join(", ")));
            }
        }
        self.current_buffer = self.reorder_buffers.pop().flatten();
        Ok(())
    }

    /// Position the input at the named field, per the record decoding
    /// protocol: replay a captured subtree, walk forward capturing
    /// strangers, or materialize the default.
    fn field_adjust(
        &mut self,
        name: &str,
        default: Option<&JsonValue>,
    ) -> Result<(), CodecError> {
        if let Some(buffer) = &mut self.current_buffer {
            if let Some(idx) = buffer.saved_fields.iter().position(|(n, _)| n == name) {
                let (_, tokens) = buffer.saved_fields.remove(idx);
                buffer.orig_input = Some(self.input.clone());
                self.input = TokenCursor::new(tokens);
                return Ok(());
            }
        }

        while let Some(JsonToken::FieldName(fname)) = self.input.current().cloned() {
            self.input.bump();
            if fname == name {
                return Ok(());
            }
            let captured = self.input.capture_value(FIELD_CAPTURE_DEPTH)?;
            self.current_buffer
                .get_or_insert_with(ReorderBuffer::default)
                .saved_fields
                .push((fname, captured));
        }

        if let Some(default) = default {
            return self.inject_default(default);
        }
        Err(CodecError::MissingField(name.to_string()))
    }

    fn inject_default(&mut self, default: &JsonValue) -> Result<(), CodecError> {
        let mut tokens = Vec::new();
        tokenize(default, &mut tokens);
        // Defaults are materialized through a shallow capture
        let mut probe = TokenCursor::new(tokens.clone());
        probe.capture_value(DEFAULT_CAPTURE_DEPTH)?;

        let buffer = self
            .current_buffer
            .get_or_insert_with(ReorderBuffer::default);
        buffer.orig_input = Some(self.input.clone());
        self.input = TokenCursor::new(tokens);
        Ok(())
    }

    /// Skip tokens up to and past the closing brace of the current
    /// record, tolerating unknown trailing members.
    fn skip_to_record_end(&mut self) -> Result<(), CodecError> {
        loop {
            match self.input.current() {
                Some(JsonToken::ObjectEnd) => {
                    self.input.bump();
                    return Ok(());
                }
                Some(JsonToken::FieldName(_)) => {
                    self.input.bump();
                    self.input.skip_value()?;
                }
                _ => return Err(self.token_err("}")),
            }
        }
    }
}

impl ActionHandler for JsonState {
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
                match self.input.current() {
                    Some(JsonToken::ObjectStart) => {
                        self.input.bump();
                        let outer = self.current_buffer.take();
                        self.reorder_buffers.push(outer);
                        Ok(Outcome::Continue)
                    }
                    _ => Err(self.token_err("record start")),
                }
            }
            Action::Structural(marker @ (Marker::RecordEnd | Marker::UnionEnd)) => {
                let closing_record = *marker == Marker::RecordEnd;
                match self.input.current().cloned() {
                    Some(JsonToken::ObjectEnd) => {
                        self.input.bump();
                        if closing_record {
                            self.finish_record()?;
                        }
                        Ok(Outcome::Continue)
                    }
                    Some(JsonToken::FieldName(fname)) if closing_record => {
                        if self.lenient {
                            self.skip_to_record_end()?;
                            self.finish_record()?;
                            Ok(Outcome::Continue)
                        } else {
                            Err(CodecError::UnknownField(fname))
                        }
                    }
                    _ => Err(self.token_err("record end")),
                }
            }
            Action::Structural(Marker::FieldEnd) => {
                if let Some(buffer) = &mut self.current_buffer {
                    if let Some(orig) = buffer.orig_input.take() {
                        self.input = orig;
                    }
                }
                Ok(Outcome::Continue)
            }
            Action::FieldAdjust {
                fname, default, ..
            } => {
                self.field_adjust(fname, default.as_ref())?;
                Ok(Outcome::Continue)
            }
            // Payload symbols popped by the reads that consume them
            _ => Ok(Outcome::Continue),
        }
    }
}

/// Field-order-agnostic JSON decoder with default injection.
pub struct JsonDecoder {
    parser: Parser,
    state: JsonState,
    context: SchemaContext,
}

impl JsonDecoder {
    /// Decode `text` against `schema`, tolerating unknown trailing
    /// fields.
    pub fn new(schema: &Schema, text: &str) -> Result<Self, CodecError> {
        Self::with_mode(schema, TokenCursor::from_str(text)?, true)
    }

    /// Decode `text` against `schema`, rejecting unknown fields.
    pub fn strict(schema: &Schema, text: &str) -> Result<Self, CodecError> {
        Self::with_mode(schema, TokenCursor::from_str(text)?, false)
    }

    /// Decode an already parsed JSON value.
    pub fn from_value(schema: &Schema, value: &JsonValue, lenient: bool) -> Result<Self, CodecError> {
        Self::with_mode(schema, TokenCursor::from_value(value), lenient)
    }

    fn with_mode(
        schema: &Schema,
        input: TokenCursor,
        lenient: bool,
    ) -> Result<Self, CodecError> {
        let compiled = json_grammar(schema).map_err(CodecError::from)?;
        let parser = Parser::new(compiled.grammar.clone(), compiled.root);
        Ok(Self {
            parser,
            state: JsonState {
                grammar: compiled.grammar,
                input,
                reorder_buffers: Vec::new(),
                current_buffer: None,
                lenient,
            },
            context: SchemaContext::from_schema(schema),
        })
    }

    fn advance(&mut self, t: Terminal) -> Result<SymbolId, CodecError> {
        let input = self.parser.term(t);
        self.parser.advance(input, &mut self.state)
    }

    fn current_token(&self) -> Option<&JsonToken> {
        self.state.input.current()
    }

    fn bump(&mut self) {
        self.state.input.bump();
    }

    fn do_array_next(&mut self) -> Result<u64, CodecError> {
        match self.current_token() {
            Some(JsonToken::ArrayEnd) => {
                self.advance(Terminal::ArrayEnd)?;
                self.bump();
                Ok(0)
            }
            Some(_) => Ok(1),
            None => Err(self.state.token_err("array item or ]")),
        }
    }

    fn do_map_next(&mut self) -> Result<u64, CodecError> {
        match self.current_token() {
            Some(JsonToken::ObjectEnd) => {
                self.advance(Terminal::MapEnd)?;
                self.bump();
                Ok(0)
            }
            Some(JsonToken::FieldName(_)) => Ok(1),
            _ => Err(self.state.token_err("map entry or }")),
        }
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

    fn pop_enum_labels(&mut self) -> Result<Vec<String>, CodecError> {
        let labels = self.parser.pop_symbol();
        match self.parser.action_of(labels) {
            Some(Action::EnumLabels(labels)) => Ok(labels.clone()),
            other => Err(CodecError::Malformed(format!(
                "enum labels missing from grammar: {:?}",
                other
            ))),
        }
    }

    /// Whether the alternative is the unwrapped `{null, T}` form.
    fn is_nullable_single(labels: &[String]) -> bool {
        labels.len() == 2 && labels.iter().any(|l| l == "null")
    }

    /// Grammar-synchronized read of the next value as a raw JSON tree.
    fn read_tree(&mut self, schema: &Schema) -> Result<JsonValue, CodecError> {
        let schema = self
            .context
            .deref(schema)
            .map_err(CodecError::from)?
            .clone();
        match schema.base() {
            Schema::Null => {
                self.read_null()?;
                Ok(JsonValue::Null)
            }
            Schema::Boolean => Ok(JsonValue::Bool(self.read_boolean()?)),
            Schema::Int => Ok(JsonValue::from(self.read_int()?)),
            Schema::Long => Ok(JsonValue::from(self.read_long()?)),
            Schema::Float => Ok(serde_json::Number::from_f64(self.read_float()? as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)),
            Schema::Double => Ok(serde_json::Number::from_f64(self.read_double()?)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)),
            Schema::String => Ok(JsonValue::String(self.read_string()?)),
            Schema::Bytes => {
                // Any JSON shape may sit where bytes are declared; take
                // the whole subtree
                self.advance(Terminal::Bytes)?;
                let tokens = self.state.input.capture_value(usize::MAX)?;
                detokenize(&tokens)
            }
            Schema::Fixed(f) => {
                let bytes = self.read_fixed(f.size)?;
                Ok(JsonValue::String(
                    bytes.iter().map(|&b| b as char).collect(),
                ))
            }
            Schema::Enum(e) => {
                let ordinal = self.read_enum()?;
                let symbol = e.symbols.get(ordinal).cloned().ok_or_else(|| {
                    CodecError::Malformed(format!("enum ordinal {} out of range", ordinal))
                })?;
                Ok(JsonValue::String(symbol))
            }
            Schema::Record(r) => {
                let mut members = serde_json::Map::new();
                for field in &r.fields {
                    let value = self.read_tree(&field.schema)?;
                    members.insert(field.name.clone(), value);
                }
                Ok(JsonValue::Object(members))
            }
            Schema::Array(items) => {
                let mut out = Vec::new();
                let mut n = self.read_array_start()?;
                while n != 0 {
                    for _ in 0..n {
                        out.push(self.read_tree(items)?);
                    }
                    n = self.array_next()?;
                }
                Ok(JsonValue::Array(out))
            }
            Schema::Map(values) => {
                let mut members = serde_json::Map::new();
                let mut n = self.read_map_start()?;
                while n != 0 {
                    for _ in 0..n {
                        let key = self.read_string()?;
                        members.insert(key, self.read_tree(values)?);
                    }
                    n = self.map_next()?;
                }
                Ok(JsonValue::Object(members))
            }
            Schema::Union(branches) => {
                let index = self.read_index()?;
                let branch = branches.get(index).cloned().ok_or_else(|| {
                    CodecError::UnionBranch(format!("union index {} out of range", index))
                })?;
                self.read_tree(&branch)
            }
            Schema::Named(name) => Err(CodecError::UnresolvedSchema(name.clone())),
            Schema::Logical(_) => unreachable!("base() strips logical bindings"),
        }
    }

    /// Synchronize the grammar on the terminal of a primitive-shaped
    /// schema before an extension read.
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
                "extension read unsupported for {} schema",
                other.branch_label()
            ))),
        }
    }

    fn take_number_text(&mut self, expected: &str) -> Result<String, CodecError> {
        let text = match self.current_token() {
            Some(JsonToken::String(s)) => s.clone(),
            Some(JsonToken::Number(n)) => n.to_string(),
            _ => return Err(self.state.token_err(expected)),
        };
        self.bump();
        Ok(text)
    }
}

impl Decoder for JsonDecoder {
    fn read_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        match self.current_token() {
            Some(JsonToken::Null) => {
                self.bump();
                Ok(())
            }
            _ => Err(self.state.token_err("null")),
        }
    }

    fn read_boolean(&mut self) -> Result<bool, CodecError> {
        self.advance(Terminal::Boolean)?;
        match self.current_token() {
            Some(JsonToken::Bool(b)) => {
                let b = *b;
                self.bump();
                Ok(b)
            }
            _ => Err(self.state.token_err("boolean")),
        }
    }

    fn read_int(&mut self) -> Result<i32, CodecError> {
        self.advance(Terminal::Int)?;
        match self.current_token() {
            Some(JsonToken::Number(n)) => {
                let v = n
                    .as_i64()
                    .filter(|v| i32::try_from(*v).is_ok())
                    .ok_or_else(|| self.state.token_err("int"))?;
                self.bump();
                Ok(v as i32)
            }
            _ => Err(self.state.token_err("int")),
        }
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        self.advance(Terminal::Long)?;
        match self.current_token() {
            Some(JsonToken::Number(n)) => {
                let v = n.as_i64().ok_or_else(|| self.state.token_err("long"))?;
                self.bump();
                Ok(v)
            }
            _ => Err(self.state.token_err("long")),
        }
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        self.advance(Terminal::Float)?;
        match self.current_token() {
            Some(JsonToken::Number(n)) => {
                let v = n.as_f64().ok_or_else(|| self.state.token_err("float"))?;
                self.bump();
                Ok(v as f32)
            }
            _ => Err(self.state.token_err("float")),
        }
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        self.advance(Terminal::Double)?;
        match self.current_token() {
            Some(JsonToken::Number(n)) => {
                let v = n.as_f64().ok_or_else(|| self.state.token_err("double"))?;
                self.bump();
                Ok(v)
            }
            _ => Err(self.state.token_err("double")),
        }
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Bytes)?;
        match self.current_token().cloned() {
            // Raw bytes ride in strings one char per byte
            Some(JsonToken::String(s)) => {
                self.bump();
                latin1_bytes(&s)
            }
            // Integer tokens carry big-integer bytes, decimal tokens a
            // scale-prefixed unscaled value
            Some(JsonToken::Number(n)) => {
                self.bump();
                if n.is_i64() || n.is_u64() {
                    let big = BigInt::from_str(&n.to_string()).map_err(|e| {
                        CodecError::Malformed(format!("invalid integer: {}", e))
                    })?;
                    Ok(big.to_signed_bytes_be())
                } else {
                    let decimal = Decimal::parse(&n.to_string()).ok_or_else(|| {
                        CodecError::Malformed(format!("invalid decimal: {}", n))
                    })?;
                    Ok(decimal.to_prefixed_bytes())
                }
            }
            _ => Err(self.state.token_err("bytes")),
        }
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        self.advance(Terminal::String)?;
        if self.parser.top_is(Terminal::MapKeyMarker) {
            self.advance(Terminal::MapKeyMarker)?;
            match self.current_token().cloned() {
                Some(JsonToken::FieldName(name)) => {
                    self.bump();
                    return Ok(name);
                }
                _ => return Err(self.state.token_err("map key")),
            }
        }
        // Numbers are legal where strings are expected: decimals may be
        // emitted as plain numbers
        match self.current_token().cloned() {
            Some(JsonToken::String(s)) => {
                self.bump();
                Ok(s)
            }
            Some(JsonToken::Number(n)) => {
                self.bump();
                Ok(n.to_string())
            }
            _ => Err(self.state.token_err("string")),
        }
    }

    fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Fixed)?;
        let declared = self.pop_size_check()?;
        if declared != size {
            return Err(CodecError::type_mismatch(
                format!("fixed of size {}", size),
                format!("fixed of size {}", declared),
            ));
        }
        match self.current_token().cloned() {
            Some(JsonToken::String(s)) => {
                self.bump();
                let bytes = latin1_bytes(&s)?;
                if bytes.len() != size {
                    return Err(CodecError::Malformed(format!(
                        "fixed value has {} bytes, schema wants {}",
                        bytes.len(),
                        size
                    )));
                }
                Ok(bytes)
            }
            _ => Err(self.state.token_err("fixed")),
        }
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Enum)?;
        let labels = self.pop_enum_labels()?;
        match self.current_token().cloned() {
            Some(JsonToken::String(symbol)) => {
                self.bump();
                labels.iter().position(|l| l == &symbol).ok_or_else(|| {
                    CodecError::type_mismatch(
                        format!("one of {:?}", labels),
                        format!("\"{}\"", symbol),
                    )
                })
            }
            _ => Err(self.state.token_err("enum symbol")),
        }
    }

    fn read_index(&mut self) -> Result<usize, CodecError> {
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

        let label = match self.current_token() {
            Some(JsonToken::Null) => "null".to_string(),
            _ if Self::is_nullable_single(&labels) => labels
                .iter()
                .find(|l| l.as_str() != "null")
                .cloned()
                .unwrap_or_default(),
            Some(JsonToken::ObjectStart) => {
                self.bump();
                match self.current_token().cloned() {
                    Some(JsonToken::FieldName(label)) => {
                        self.bump();
                        self.parser
                            .push_symbol(self.state.grammar.marker(Marker::UnionEnd));
                        label
                    }
                    _ => return Err(CodecError::UnionBranch("missing branch tag".to_string())),
                }
            }
            _ => {
                return Err(CodecError::UnionBranch(format!(
                    "expected union tag object, found {}",
                    self.current_token()
                        .map(|t| t.describe())
                        .unwrap_or_else(|| "end of input".to_string())
                )))
            }
        };

        let index = labels
            .iter()
            .position(|l| l == &label)
            .ok_or_else(|| CodecError::UnionBranch(format!("unknown union branch {}", label)))?;
        self.parser.push_symbol(branches[index]);
        Ok(index)
    }

    fn read_array_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        match self.current_token() {
            Some(JsonToken::ArrayStart) => {
                self.bump();
                self.do_array_next()
            }
            _ => Err(self.state.token_err("[")),
        }
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ItemEnd)?;
        self.do_array_next()
    }

    fn read_map_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        match self.current_token() {
            Some(JsonToken::ObjectStart) => {
                self.bump();
                self.do_map_next()
            }
            _ => Err(self.state.token_err("{")),
        }
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ItemEnd)?;
        self.do_map_next()
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Bytes)?;
        match self.current_token() {
            Some(JsonToken::String(_) | JsonToken::Number(_)) => {
                self.bump();
                Ok(())
            }
            _ => Err(self.state.token_err("bytes")),
        }
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::String)?;
        if self.parser.top_is(Terminal::MapKeyMarker) {
            self.advance(Terminal::MapKeyMarker)?;
            match self.current_token() {
                Some(JsonToken::FieldName(_)) => {
                    self.bump();
                    return Ok(());
                }
                _ => return Err(self.state.token_err("map key")),
            }
        }
        match self.current_token() {
            Some(JsonToken::String(_) | JsonToken::Number(_)) => {
                self.bump();
                Ok(())
            }
            _ => Err(self.state.token_err("string")),
        }
    }

    fn skip_fixed(&mut self, size: usize) -> Result<(), CodecError> {
        self.read_fixed(size).map(|_| ())
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        match self.current_token() {
            Some(JsonToken::ArrayStart) => self.state.input.skip_value()?,
            _ => return Err(self.state.token_err("[")),
        }
        self.advance(Terminal::ArrayEnd)?;
        Ok(0)
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        match self.current_token() {
            Some(JsonToken::ObjectStart) => self.state.input.skip_value()?,
            _ => return Err(self.state.token_err("{")),
        }
        self.advance(Terminal::MapEnd)?;
        Ok(0)
    }

    fn drain(&mut self) -> Result<(), CodecError> {
        self.parser.process_implicit_actions(&mut self.state)
    }

    fn json_extension(&mut self) -> Option<&mut dyn JsonExtensionDecoder> {
        Some(self)
    }
}

impl JsonExtensionDecoder for JsonDecoder {
    fn read_big_decimal(&mut self, schema: &Schema) -> Result<Decimal, CodecError> {
        self.advance_by(schema)?;
        let text = self.take_number_text("decimal")?;
        Decimal::parse(&text)
            .ok_or_else(|| CodecError::Malformed(format!("invalid decimal: {}", text)))
    }

    fn read_big_integer(&mut self, schema: &Schema) -> Result<BigInt, CodecError> {
        self.advance_by(schema)?;
        let text = self.take_number_text("integer")?;
        BigInt::from_str(&text)
            .map_err(|e| CodecError::Malformed(format!("invalid integer: {}", e)))
    }

    fn read_value_as_tree(&mut self, schema: &Schema) -> Result<JsonValue, CodecError> {
        self.read_tree(schema)
    }
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

/// Scale-prefixed unscaled-value encoding used when a decimal number
/// token lands in a plain bytes position.
impl Decimal {
    pub(crate) fn to_prefixed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        crate::binary::encode_zigzag(self.scale as i64, &mut out);
        out.extend_from_slice(&self.to_be_bytes());
        out
    }
}
