//! The resolving decoder.
//!
//! Wraps any decoder with a resolution grammar so the caller observes
//! reader-shaped values regardless of how the writer laid them out:
//! primitives widen per the promotion rules, record fields surface in a
//! resolved order with writer-only fields skipped and reader defaults
//! injected from pre-encoded bytes, enum ordinals remap, and union
//! branches adjust to the reader's numbering.

use std::sync::Arc;

use crate::binary::BinaryDecoder;
use crate::codec::{Decoder, FieldBinding};
use crate::error::CodecError;
use crate::grammar::{
    cached_resolving_grammar, Action, ActionHandler, Grammar, Outcome, Parser, Symbol, SymbolId,
    Terminal,
};
use crate::schema::Schema;

/// A default region being replayed: binary-encoded default bytes with a
/// read position.
#[derive(Debug)]
struct DefaultRegion {
    bytes: Vec<u8>,
    pos: usize,
}

/// Handler state: everything the resolution actions touch.
struct ResolverState<'a> {
    grammar: Arc<Grammar>,
    inner: &'a mut dyn Decoder,
    /// Injected default inputs, innermost last
    defaults: Vec<DefaultRegion>,
}

impl ResolverState<'_> {
    /// Run a read against the active input: the innermost default region
    /// when one is being replayed, the wrapped decoder otherwise.
    fn with_input<T>(
        &mut self,
        f: impl FnOnce(&mut dyn Decoder) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        match self.defaults.last_mut() {
            Some(region) => {
                let mut dec = BinaryDecoder::new(&region.bytes[region.pos..]);
                let before = dec.remaining();
                let out = f(&mut dec);
                region.pos += before - dec.remaining();
                out
            }
            None => f(self.inner),
        }
    }

    /// Skip one writer-shaped value described by `symbol` against the
    /// active input.
    fn skip_symbol(&mut self, symbol: SymbolId) -> Result<(), CodecError> {
        let grammar = self.grammar.clone();
        let mut stack = vec![symbol];
        while let Some(top) = stack.pop() {
            match grammar.symbol(top) {
                Symbol::Terminal(t) => match t {
                    Terminal::Null => {}
                    Terminal::Boolean => {
                        self.with_input(|d| d.read_boolean())?;
                    }
                    Terminal::Int => {
                        self.with_input(|d| d.read_int())?;
                    }
                    Terminal::Long => {
                        self.with_input(|d| d.read_long())?;
                    }
                    Terminal::Float => self.with_input(|d| d.skip_fixed(4))?,
                    Terminal::Double => self.with_input(|d| d.skip_fixed(8))?,
                    Terminal::Bytes => self.with_input(|d| d.skip_bytes())?,
                    Terminal::String => self.with_input(|d| d.skip_string())?,
                    Terminal::Fixed => {
                        let size = match stack.pop().map(|id| grammar.symbol(id).clone()) {
                            Some(Symbol::Action(Action::SizeCheck(n))) => n,
                            other => {
                                return Err(CodecError::Malformed(format!(
                                    "fixed size missing while skipping: {:?}",
                                    other
                                )))
                            }
                        };
                        self.with_input(|d| d.skip_fixed(size))?;
                    }
                    Terminal::Enum => {
                        let limit = match stack.pop().map(|id| grammar.symbol(id).clone()) {
                            Some(Symbol::Action(Action::SizeCheck(n))) => n,
                            other => {
                                return Err(CodecError::Malformed(format!(
                                    "enum bound missing while skipping: {:?}",
                                    other
                                )))
                            }
                        };
                        let ordinal = self.with_input(|d| d.read_enum())?;
                        if ordinal >= limit {
                            return Err(CodecError::Malformed(format!(
                                "enum ordinal {} out of range (0..{})",
                                ordinal, limit
                            )));
                        }
                    }
                    Terminal::Union => {
                        let index = self.with_input(|d| d.read_index())?;
                        match stack.pop().map(|id| grammar.symbol(id).clone()) {
                            Some(Symbol::Alternative { branches, .. }) => {
                                let branch = branches.get(index).copied().ok_or_else(|| {
                                    CodecError::Malformed(format!(
                                        "union index {} out of range (0..{})",
                                        index,
                                        branches.len()
                                    ))
                                })?;
                                stack.push(branch);
                            }
                            other => {
                                return Err(CodecError::Malformed(format!(
                                    "union alternative missing while skipping: {:?}",
                                    other
                                )))
                            }
                        }
                    }
                    // Structural terminals carry no wire bytes
                    _ => {}
                },
                Symbol::Repeater { end, .. } => {
                    let items = grammar.repeater_items(top);
                    let is_map = *end == Terminal::MapEnd;
                    loop {
                        let n = self.with_input(|d| {
                            if is_map {
                                d.skip_map()
                            } else {
                                d.skip_array()
                            }
                        })?;
                        if n == 0 {
                            break;
                        }
                        for _ in 0..n {
                            for &item in &items {
                                self.skip_symbol(item)?;
                            }
                        }
                    }
                }
                Symbol::Root(p) | Symbol::Sequence(p) => {
                    // Stored reversed; extending keeps first-exec on top
                    stack.extend_from_slice(p);
                }
                Symbol::Action(_) => {}
                Symbol::Alternative { .. } => {
                    return Err(CodecError::Malformed(
                        "dangling union alternative while skipping".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl ActionHandler for ResolverState<'_> {
    fn do_action(
        &mut self,
        input: Option<SymbolId>,
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
            Action::FieldOrder { .. } => {
                let field_action = grammar.terminal(Terminal::FieldAction);
                if input == Some(field_action) {
                    Ok(Outcome::Yield(top))
                } else {
                    Ok(Outcome::Continue)
                }
            }
            // Binary writers emit declaration order, so positioning at a
            // named field is a no-op
            Action::FieldAdjust { .. } => Ok(Outcome::Continue),
            Action::Skip { symbol } => {
                self.skip_symbol(*symbol)?;
                Ok(Outcome::Continue)
            }
            Action::DefaultStart { bytes } => {
                self.defaults.push(DefaultRegion {
                    bytes: bytes.clone(),
                    pos: 0,
                });
                Ok(Outcome::Continue)
            }
            Action::DefaultEnd => {
                self.defaults.pop();
                Ok(Outcome::Continue)
            }
            Action::WriterUnion => {
                let index = self.with_input(|d| d.read_index())?;
                Ok(Outcome::SelectBranch(index))
            }
            Action::Promote { writer, reader } => {
                let reader_term = grammar.terminal(*reader);
                match input {
                    Some(sym) if sym == reader_term => {
                        Ok(Outcome::Yield(grammar.terminal(*writer)))
                    }
                    _ => Err(CodecError::type_mismatch(
                        format!("{:?}", reader),
                        "promotion in a non-reading position".to_string(),
                    )),
                }
            }
            Action::Error(message) => Err(CodecError::UnionBranch(message.clone())),
            // Payload symbols popped by the reads that consume them;
            // structural markers never occur in a resolution grammar
            Action::SizeCheck(_)
            | Action::EnumLabels(_)
            | Action::EnumAdjust { .. }
            | Action::UnionAdjust { .. }
            | Action::Structural(_) => Ok(Outcome::Continue),
        }
    }
}

/// Decoder that reconciles writer and reader schemas while delegating
/// wire access to an inner decoder.
pub struct ResolvingDecoder<'a> {
    parser: Parser,
    state: ResolverState<'a>,
}

impl<'a> ResolvingDecoder<'a> {
    /// Build a resolving decoder for the writer/reader pair over `inner`.
    ///
    /// The resolution grammar is fetched from the process-wide cache
    /// keyed by the schema fingerprints.
    pub fn new(
        writer: &Schema,
        reader: &Schema,
        inner: &'a mut dyn Decoder,
    ) -> Result<Self, CodecError> {
        let compiled = cached_resolving_grammar(writer, reader)?;
        let parser = Parser::new(compiled.grammar.clone(), compiled.root);
        Ok(Self {
            parser,
            state: ResolverState {
                grammar: compiled.grammar,
                inner,
                defaults: Vec::new(),
            },
        })
    }

    fn advance(&mut self, t: Terminal) -> Result<SymbolId, CodecError> {
        let input = self.parser.term(t);
        self.parser.advance(input, &mut self.state)
    }

    fn terminal_of(&self, id: SymbolId) -> Option<Terminal> {
        match self.parser.grammar().symbol(id) {
            Symbol::Terminal(t) => Some(*t),
            _ => None,
        }
    }
}

impl Decoder for ResolvingDecoder<'_> {
    fn read_null(&mut self) -> Result<(), CodecError> {
        self.advance(Terminal::Null)?;
        self.state.with_input(|d| d.read_null())
    }

    fn read_boolean(&mut self) -> Result<bool, CodecError> {
        self.advance(Terminal::Boolean)?;
        self.state.with_input(|d| d.read_boolean())
    }

    fn read_int(&mut self) -> Result<i32, CodecError> {
        self.advance(Terminal::Int)?;
        self.state.with_input(|d| d.read_int())
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        let actual = self.advance(Terminal::Long)?;
        match self.terminal_of(actual) {
            Some(Terminal::Long) => self.state.with_input(|d| d.read_long()),
            Some(Terminal::Int) => Ok(self.state.with_input(|d| d.read_int())? as i64),
            other => Err(CodecError::type_mismatch("long", format!("{:?}", other))),
        }
    }

    fn read_float(&mut self) -> Result<f32, CodecError> {
        let actual = self.advance(Terminal::Float)?;
        match self.terminal_of(actual) {
            Some(Terminal::Float) => self.state.with_input(|d| d.read_float()),
            Some(Terminal::Int) => Ok(self.state.with_input(|d| d.read_int())? as f32),
            Some(Terminal::Long) => Ok(self.state.with_input(|d| d.read_long())? as f32),
            other => Err(CodecError::type_mismatch("float", format!("{:?}", other))),
        }
    }

    fn read_double(&mut self) -> Result<f64, CodecError> {
        let actual = self.advance(Terminal::Double)?;
        match self.terminal_of(actual) {
            Some(Terminal::Double) => self.state.with_input(|d| d.read_double()),
            Some(Terminal::Float) => Ok(self.state.with_input(|d| d.read_float())? as f64),
            Some(Terminal::Int) => Ok(self.state.with_input(|d| d.read_int())? as f64),
            Some(Terminal::Long) => Ok(self.state.with_input(|d| d.read_long())? as f64),
            other => Err(CodecError::type_mismatch("double", format!("{:?}", other))),
        }
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let actual = self.advance(Terminal::Bytes)?;
        match self.terminal_of(actual) {
            Some(Terminal::Bytes) => self.state.with_input(|d| d.read_bytes()),
            Some(Terminal::String) => {
                Ok(self.state.with_input(|d| d.read_string())?.into_bytes())
            }
            other => Err(CodecError::type_mismatch("bytes", format!("{:?}", other))),
        }
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let actual = self.advance(Terminal::String)?;
        match self.terminal_of(actual) {
            Some(Terminal::String) => self.state.with_input(|d| d.read_string()),
            Some(Terminal::Bytes) => {
                let bytes = self.state.with_input(|d| d.read_bytes())?;
                String::from_utf8(bytes)
                    .map_err(|e| CodecError::Malformed(format!("invalid UTF-8: {}", e)))
            }
            other => Err(CodecError::type_mismatch("string", format!("{:?}", other))),
        }
    }

    fn read_fixed(&mut self, size: usize) -> Result<Vec<u8>, CodecError> {
        self.advance(Terminal::Fixed)?;
        let check = self.parser.pop_symbol();
        match self.parser.action_of(check) {
            Some(Action::SizeCheck(n)) if *n == size => {}
            Some(Action::SizeCheck(n)) => {
                return Err(CodecError::type_mismatch(
                    format!("fixed of size {}", size),
                    format!("fixed of size {}", n),
                ))
            }
            _ => {
                return Err(CodecError::Malformed(
                    "fixed size missing from grammar".to_string(),
                ))
            }
        }
        self.state.with_input(|d| d.read_fixed(size))
    }

    fn read_enum(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Enum)?;
        let adjust = self.parser.pop_symbol();
        let mapping = match self.parser.action_of(adjust) {
            Some(Action::EnumAdjust { mapping }) => mapping.clone(),
            other => {
                return Err(CodecError::Malformed(format!(
                    "enum adjustment missing from grammar: {:?}",
                    other
                )))
            }
        };
        let wire = self.state.with_input(|d| d.read_enum())?;
        match mapping.get(wire) {
            Some(crate::grammar::EnumMapping::Ordinal(n)) => Ok(*n),
            Some(crate::grammar::EnumMapping::Unmatched(msg)) => {
                Err(CodecError::type_mismatch("resolvable enum ordinal", msg.clone()))
            }
            None => Err(CodecError::Malformed(format!(
                "enum ordinal {} out of writer range",
                wire
            ))),
        }
    }

    fn read_index(&mut self) -> Result<usize, CodecError> {
        self.advance(Terminal::Union)?;
        let adjust = self.parser.pop_symbol();
        match self.parser.action_of(adjust) {
            Some(Action::UnionAdjust {
                reader_index,
                symbol,
            }) => {
                let (reader_index, symbol) = (*reader_index, *symbol);
                self.parser.push_symbol(symbol);
                Ok(reader_index)
            }
            other => Err(CodecError::Malformed(format!(
                "union adjustment missing from grammar: {:?}",
                other
            ))),
        }
    }

    fn read_array_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::ArrayStart)?;
        let n = self.state.with_input(|d| d.read_array_start())?;
        if n == 0 {
            self.advance(Terminal::ArrayEnd)?;
        }
        Ok(n)
    }

    fn array_next(&mut self) -> Result<u64, CodecError> {
        self.parser
            .process_trailing_implicit_actions(&mut self.state)?;
        let n = self.state.with_input(|d| d.array_next())?;
        if n == 0 {
            self.advance(Terminal::ArrayEnd)?;
        }
        Ok(n)
    }

    fn read_map_start(&mut self) -> Result<u64, CodecError> {
        self.advance(Terminal::MapStart)?;
        let n = self.state.with_input(|d| d.read_map_start())?;
        if n == 0 {
            self.advance(Terminal::MapEnd)?;
        }
        Ok(n)
    }

    fn map_next(&mut self) -> Result<u64, CodecError> {
        self.parser
            .process_trailing_implicit_actions(&mut self.state)?;
        let n = self.state.with_input(|d| d.map_next())?;
        if n == 0 {
            self.advance(Terminal::MapEnd)?;
        }
        Ok(n)
    }

    fn skip_bytes(&mut self) -> Result<(), CodecError> {
        let actual = self.advance(Terminal::Bytes)?;
        match self.terminal_of(actual) {
            Some(Terminal::String) => self.state.with_input(|d| d.skip_string()),
            _ => self.state.with_input(|d| d.skip_bytes()),
        }
    }

    fn skip_string(&mut self) -> Result<(), CodecError> {
        let actual = self.advance(Terminal::String)?;
        match self.terminal_of(actual) {
            Some(Terminal::Bytes) => self.state.with_input(|d| d.skip_bytes()),
            _ => self.state.with_input(|d| d.skip_string()),
        }
    }

    fn skip_fixed(&mut self, size: usize) -> Result<(), CodecError> {
        self.read_fixed(size).map(|_| ())
    }

    fn skip_array(&mut self) -> Result<u64, CodecError> {
        // Skips drive the plain writer grammar embedded in skip actions,
        // never the resolving surface
        Err(CodecError::Malformed(
            "skip_array unsupported on a resolving decoder".to_string(),
        ))
    }

    fn skip_map(&mut self) -> Result<u64, CodecError> {
        Err(CodecError::Malformed(
            "skip_map unsupported on a resolving decoder".to_string(),
        ))
    }

    fn read_field_order(&mut self) -> Result<Option<Vec<FieldBinding>>, CodecError> {
        let input = self.parser.term(Terminal::FieldAction);
        let order = self.parser.advance(input, &mut self.state)?;
        match self.parser.action_of(order) {
            Some(Action::FieldOrder { fields }) => Ok(Some(fields.clone())),
            other => Err(CodecError::Malformed(format!(
                "field order missing from grammar: {:?}",
                other
            ))),
        }
    }

    fn drain(&mut self) -> Result<(), CodecError> {
        self.parser
            .process_trailing_implicit_actions(&mut self.state)
    }
}
