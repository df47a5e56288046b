//! Grammar symbols and the symbol arena.
//!
//! A schema compiles into a production-rule symbol graph that drives
//! every parser-based codec. Symbols live in a [`Grammar`] arena and are
//! addressed by [`SymbolId`]; identity of ids is identity of symbols,
//! which is what the parser's fast path compares. Cyclic schemas are
//! handled by allocating a forwarding symbol up front and patching its
//! production once the cycle closes.
//!
//! Productions are stored in reverse execution order: pushing a
//! production copies it onto the parser stack as stored, which leaves the
//! first symbol to execute on top.

mod binary;
mod json;
pub mod parser;
mod resolving;

pub use binary::binary_grammar;
pub use json::json_grammar;
pub use parser::{ActionHandler, Outcome, Parser};
pub use resolving::resolving_grammar;

use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value as JsonValue;

use crate::codec::FieldBinding;
use crate::error::CodecError;
use crate::schema::{fingerprint64, Schema};

/// Index of a symbol within its [`Grammar`] arena.
///
/// Symbols are immutable once interned; equality is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The id of the symbol at arena index `index`.
    pub fn at(index: usize) -> Self {
        SymbolId(index as u32)
    }
}

/// Terminal symbols: the tokens codecs synchronize on.
///
/// The first group matches wire values; the second group is structural
/// and only appears in the JSON grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Fixed,
    Enum,
    Union,
    ArrayStart,
    ArrayEnd,
    MapStart,
    MapEnd,
    ItemEnd,
    FieldAction,
    MapKeyMarker,
}

/// All terminals, in the order they are interned into every arena.
const TERMINALS: &[Terminal] = &[
    Terminal::Null,
    Terminal::Boolean,
    Terminal::Int,
    Terminal::Long,
    Terminal::Float,
    Terminal::Double,
    Terminal::Bytes,
    Terminal::String,
    Terminal::Fixed,
    Terminal::Enum,
    Terminal::Union,
    Terminal::ArrayStart,
    Terminal::ArrayEnd,
    Terminal::MapStart,
    Terminal::MapEnd,
    Terminal::ItemEnd,
    Terminal::FieldAction,
    Terminal::MapKeyMarker,
];

/// Structural markers of the JSON grammar: implicit actions with no
/// payload, fired on the way to the next value terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Consume the object opener of a record
    RecordStart,
    /// Consume the object closer of a record
    RecordEnd,
    /// Consume the object closer of a tagged union
    UnionEnd,
    /// Restore input redirected for an out-of-order field
    FieldEnd,
}

/// All markers, in the order they are interned after the terminals.
const MARKERS: &[Marker] = &[
    Marker::RecordStart,
    Marker::RecordEnd,
    Marker::UnionEnd,
    Marker::FieldEnd,
];

/// How an unmapped or remapped writer enum ordinal resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumMapping {
    /// Writer ordinal maps to this reader ordinal
    Ordinal(usize),
    /// Writer ordinal has no reader counterpart; reading it fails with
    /// this message
    Unmatched(String),
}

/// Side-effect symbols interleaved into productions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// JSON structural marker
    Structural(Marker),
    /// Fixed size or enum symbol count, popped by the corresponding read
    SizeCheck(usize),
    /// Enum symbol table for the JSON codec
    EnumLabels(Vec<String>),
    /// Consume the writer's union index and select the matching branch
    /// from the alternative beneath
    WriterUnion,
    /// Surface `reader_index` to the caller and parse `symbol`
    UnionAdjust {
        reader_index: usize,
        symbol: SymbolId,
    },
    /// Writer-to-reader enum ordinal remapping
    EnumAdjust { mapping: Vec<EnumMapping> },
    /// Position the decoder at the named field
    FieldAdjust {
        fname: String,
        position: usize,
        default: Option<JsonValue>,
    },
    /// Reader fields in decode order, surfaced by `read_field_order`
    FieldOrder { fields: Vec<FieldBinding> },
    /// Switch input to the embedded binary-encoded default
    DefaultStart { bytes: Vec<u8> },
    /// Restore input after an injected default
    DefaultEnd,
    /// Skip the writer-only value described by `symbol`
    Skip { symbol: SymbolId },
    /// Read the writer terminal, surface it so the caller widens
    Promote { writer: Terminal, reader: Terminal },
    /// Deferred resolution failure; reading this region fails
    Error(String),
}

impl Action {
    /// Trailing actions may fire during a drain at the end of a record
    /// scope; all others fire only on the way to the next terminal.
    pub fn is_trailing(&self) -> bool {
        matches!(self, Action::Skip { .. } | Action::DefaultEnd)
    }
}

/// A node in the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Matches one input token
    Terminal(Terminal),
    /// Entry point; keeps itself under the datum so the stack never
    /// empties mid-parse
    Root(Vec<SymbolId>),
    /// Expands to its production
    Sequence(Vec<SymbolId>),
    /// Blocked array/map iteration; the production re-enters the repeater
    Repeater {
        end: Terminal,
        production: Vec<SymbolId>,
    },
    /// One branch per union alternative
    Alternative {
        labels: Vec<String>,
        branches: Vec<SymbolId>,
    },
    /// Side effect performed by the action handler
    Action(Action),
}

/// Arena of interned symbols for one compiled grammar.
#[derive(Debug)]
pub struct Grammar {
    symbols: Vec<Symbol>,
}

impl Grammar {
    /// Create an arena with all terminals and markers pre-seeded.
    pub fn new() -> Self {
        let mut symbols: Vec<Symbol> = TERMINALS.iter().map(|t| Symbol::Terminal(*t)).collect();
        symbols.extend(
            MARKERS
                .iter()
                .map(|m| Symbol::Action(Action::Structural(*m))),
        );
        Self { symbols }
    }

    /// The interned id of a structural marker.
    pub fn marker(&self, m: Marker) -> SymbolId {
        let idx = MARKERS
            .iter()
            .position(|x| *x == m)
            .expect("marker is pre-seeded");
        SymbolId((TERMINALS.len() + idx) as u32)
    }

    /// The interned id of a terminal.
    pub fn terminal(&self, t: Terminal) -> SymbolId {
        let idx = TERMINALS
            .iter()
            .position(|x| *x == t)
            .expect("terminal is pre-seeded");
        SymbolId(idx as u32)
    }

    /// Look up a symbol.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the arena holds only the pre-seeded symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.len() <= TERMINALS.len() + MARKERS.len()
    }

    /// Whether `id` is the given terminal.
    pub fn is_terminal(&self, id: SymbolId, t: Terminal) -> bool {
        matches!(self.symbol(id), Symbol::Terminal(x) if *x == t)
    }

    /// Intern a new symbol.
    pub fn intern(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Allocate a forwarding placeholder to be patched once a cycle
    /// closes.
    pub fn placeholder(&mut self) -> SymbolId {
        self.intern(Symbol::Sequence(Vec::new()))
    }

    /// Patch a previously allocated placeholder.
    pub fn patch(&mut self, id: SymbolId, symbol: Symbol) {
        self.symbols[id.0 as usize] = symbol;
    }

    /// Intern a sequence from symbols given in execution order.
    pub fn seq(&mut self, exec_order: Vec<SymbolId>) -> SymbolId {
        let mut production = exec_order;
        production.reverse();
        self.intern(Symbol::Sequence(production))
    }

    /// Intern a repeater whose items are given in execution order.
    ///
    /// The repeater's production re-enters the repeater after the items,
    /// which is what makes block iteration loop.
    pub fn repeat(&mut self, end: Terminal, exec_items: Vec<SymbolId>) -> SymbolId {
        let id = self.intern(Symbol::Repeater {
            end,
            production: Vec::new(),
        });
        let mut production = vec![id];
        production.extend(exec_items.iter().rev());
        self.symbols[id.0 as usize] = Symbol::Repeater { end, production };
        id
    }

    /// Intern an alternative.
    pub fn alt(&mut self, labels: Vec<String>, branches: Vec<SymbolId>) -> SymbolId {
        self.intern(Symbol::Alternative { labels, branches })
    }

    /// Intern an action.
    pub fn action(&mut self, action: Action) -> SymbolId {
        self.intern(Symbol::Action(action))
    }

    /// Intern the root for a datum symbol.
    pub fn root(&mut self, datum: SymbolId) -> SymbolId {
        let id = self.intern(Symbol::Root(Vec::new()));
        self.symbols[id.0 as usize] = Symbol::Root(vec![id, datum]);
        id
    }

    /// The items of a repeater in execution order, excluding the
    /// re-entry.
    pub fn repeater_items(&self, id: SymbolId) -> Vec<SymbolId> {
        match self.symbol(id) {
            Symbol::Repeater { production, .. } => {
                production[1..].iter().rev().copied().collect()
            }
            _ => Vec::new(),
        }
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled grammar with its entry point.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    /// The shared arena
    pub grammar: Arc<Grammar>,
    /// The root symbol
    pub root: SymbolId,
}

type GrammarCache = Mutex<std::collections::HashMap<(u64, u64), CompiledGrammar>>;

fn cache() -> &'static GrammarCache {
    static CACHE: OnceLock<GrammarCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

/// Fetch or compile the resolution grammar for a writer/reader pair,
/// keyed by the pair of canonical-form fingerprints.
pub fn cached_resolving_grammar(
    writer: &Schema,
    reader: &Schema,
) -> Result<CompiledGrammar, CodecError> {
    let key = (fingerprint64(writer), fingerprint64(reader));
    if let Some(hit) = cache().lock().expect("grammar cache poisoned").get(&key) {
        return Ok(hit.clone());
    }
    tracing::debug!(
        writer_fingerprint = format_args!("{:016x}", key.0),
        reader_fingerprint = format_args!("{:016x}", key.1),
        "compiling resolution grammar"
    );
    let compiled = resolving_grammar(writer, reader)?;
    cache()
        .lock()
        .expect("grammar cache poisoned")
        .insert(key, compiled.clone());
    Ok(compiled)
}
