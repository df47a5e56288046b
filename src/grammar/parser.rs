//! The parser state machine.
//!
//! A stack of symbols advanced against expected terminals. The engine is
//! purely mechanical: everything it knows about the wire lives in the
//! symbols and in the [`ActionHandler`] the owning codec supplies.

use std::sync::Arc;

use crate::error::CodecError;
use crate::grammar::{Action, Grammar, Symbol, SymbolId, Terminal};

/// What an action handler asks the parser to do next.
#[derive(Debug)]
pub enum Outcome {
    /// Keep processing the stack
    Continue,
    /// Stop and return this symbol from `advance`
    Yield(SymbolId),
    /// Push a symbol and keep processing
    Push(SymbolId),
    /// Pop the alternative beneath and push its branch at this index
    SelectBranch(usize),
}

/// Handles action symbols on behalf of the parser.
///
/// `input` is the terminal the caller of `advance` is looking for, or
/// `None` when actions are being drained outside an advance.
pub trait ActionHandler {
    /// Handle the action `top`; the payload is looked up by the handler
    /// in its own reference to the grammar.
    fn do_action(&mut self, input: Option<SymbolId>, top: SymbolId)
        -> Result<Outcome, CodecError>;
}

/// The shape of the symbol currently on top of the stack.
#[derive(Debug, Clone, Copy)]
enum TopKind {
    Terminal(Terminal),
    Action { trailing: bool },
    Repeater(Terminal),
    /// An alternative must be selected by the read that consumed its
    /// union terminal, never expanded blindly
    Alternative,
    Expandable,
}

/// Symbol stack with the advance/skip operations.
#[derive(Debug)]
pub struct Parser {
    grammar: Arc<Grammar>,
    stack: Vec<SymbolId>,
    pos: usize,
}

impl Parser {
    /// Create a parser positioned at `root`.
    pub fn new(grammar: Arc<Grammar>, root: SymbolId) -> Self {
        let mut stack = Vec::with_capacity(16);
        stack.push(root);
        Self {
            grammar,
            stack,
            pos: 1,
        }
    }

    /// The shared grammar this parser runs.
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    fn kind_of(&self, id: SymbolId) -> TopKind {
        match self.grammar.symbol(id) {
            Symbol::Terminal(t) => TopKind::Terminal(*t),
            Symbol::Action(a) => TopKind::Action {
                trailing: a.is_trailing(),
            },
            Symbol::Repeater { end, .. } => TopKind::Repeater(*end),
            Symbol::Alternative { .. } => TopKind::Alternative,
            _ => TopKind::Expandable,
        }
    }

    fn describe(&self, id: SymbolId) -> String {
        match self.grammar.symbol(id) {
            Symbol::Terminal(t) => format!("{:?}", t),
            other => format!("{:?}", other),
        }
    }

    /// Grow the stack to hold at least `min_capacity` symbols.
    ///
    /// Growth is capacity + capacity/2, jumping straight to the minimum
    /// when that is still short.
    fn ensure_capacity(&mut self, min_capacity: usize) {
        let old = self.stack.len();
        if min_capacity > old {
            let target = (old + (old >> 1)).max(min_capacity);
            self.stack.resize(target, SymbolId(0));
        }
    }

    /// Recursively replace the top of the stack with its production until
    /// the top is a terminal, then check it against `input`.
    ///
    /// Returns the matched terminal, or whatever symbol an action handler
    /// yielded instead.
    pub fn advance<H: ActionHandler>(
        &mut self,
        input: SymbolId,
        handler: &mut H,
    ) -> Result<SymbolId, CodecError> {
        loop {
            self.pos -= 1;
            let top = self.stack[self.pos];
            if top == input {
                return Ok(top);
            }

            match self.kind_of(top) {
                TopKind::Action { .. } => match handler.do_action(Some(input), top)? {
                    Outcome::Continue => {}
                    Outcome::Yield(sym) => return Ok(sym),
                    Outcome::Push(sym) => self.push_symbol(sym),
                    Outcome::SelectBranch(index) => self.select_branch(index)?,
                },
                TopKind::Terminal(_) => {
                    return Err(CodecError::type_mismatch(
                        self.describe(input),
                        self.describe(top),
                    ));
                }
                TopKind::Repeater(end) => {
                    if self.grammar.is_terminal(input, end) {
                        return Ok(input);
                    }
                    self.push_production(top);
                }
                TopKind::Alternative => {
                    return Err(CodecError::type_mismatch(
                        self.describe(input),
                        "unselected union alternative",
                    ));
                }
                TopKind::Expandable => self.push_production(top),
            }
        }
    }

    /// Like `advance`, but drops action symbols instead of running them;
    /// used when skipping a region whose side effects must not fire.
    pub fn skip_terminal(&mut self, input: SymbolId) -> Result<(), CodecError> {
        loop {
            self.pos -= 1;
            let top = self.stack[self.pos];
            if top == input {
                return Ok(());
            }
            match self.kind_of(top) {
                TopKind::Terminal(_) => {
                    return Err(CodecError::type_mismatch(
                        self.describe(input),
                        self.describe(top),
                    ));
                }
                TopKind::Repeater(end) => {
                    if self.grammar.is_terminal(input, end) {
                        return Ok(());
                    }
                    self.push_production(top);
                }
                TopKind::Action { .. } => {}
                TopKind::Alternative => {
                    return Err(CodecError::type_mismatch(
                        self.describe(input),
                        "unselected union alternative",
                    ));
                }
                TopKind::Expandable => self.push_production(top),
            }
        }
    }

    /// Run implicit actions at the top of the stack, expanding any
    /// production on the way, until a terminal blocks.
    pub fn process_implicit_actions<H: ActionHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<(), CodecError> {
        while self.pos > 1 {
            let top = self.stack[self.pos - 1];
            match self.kind_of(top) {
                TopKind::Action { .. } => {
                    self.pos -= 1;
                    self.run_drained_action(top, handler)?;
                }
                TopKind::Terminal(_) | TopKind::Repeater(_) | TopKind::Alternative => break,
                TopKind::Expandable => {
                    self.pos -= 1;
                    self.push_production(top);
                }
            }
        }
        Ok(())
    }

    /// Run only the actions flagged as trailing at the top of the stack.
    pub fn process_trailing_implicit_actions<H: ActionHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<(), CodecError> {
        while self.pos >= 1 {
            let top = self.stack[self.pos - 1];
            match self.kind_of(top) {
                TopKind::Action { trailing: true } => {
                    self.pos -= 1;
                    self.run_drained_action(top, handler)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn run_drained_action<H: ActionHandler>(
        &mut self,
        top: SymbolId,
        handler: &mut H,
    ) -> Result<(), CodecError> {
        match handler.do_action(None, top)? {
            Outcome::Continue | Outcome::Yield(_) => Ok(()),
            Outcome::Push(sym) => {
                self.push_symbol(sym);
                Ok(())
            }
            Outcome::SelectBranch(index) => self.select_branch(index),
        }
    }

    /// Push the production of `sym` onto the stack.
    pub fn push_production(&mut self, sym: SymbolId) {
        let len = match self.grammar.symbol(sym) {
            Symbol::Root(p) | Symbol::Sequence(p) => p.len(),
            Symbol::Repeater { production, .. } => production.len(),
            _ => return,
        };
        self.ensure_capacity(self.pos + len);
        for i in 0..len {
            let id = match self.grammar.symbol(sym) {
                Symbol::Root(p) | Symbol::Sequence(p) => p[i],
                Symbol::Repeater { production, .. } => production[i],
                _ => unreachable!(),
            };
            self.stack[self.pos + i] = id;
        }
        self.pos += len;
    }

    /// Pop the alternative on top and push its branch at `index`.
    fn select_branch(&mut self, index: usize) -> Result<(), CodecError> {
        let top = self.pop_symbol();
        let branch = match self.grammar.symbol(top) {
            Symbol::Alternative { branches, .. } => branches.get(index).copied(),
            _ => {
                return Err(CodecError::type_mismatch(
                    "union alternative",
                    self.describe(top),
                ))
            }
        };
        let branch = branch.ok_or_else(|| {
            CodecError::UnionBranch(format!("union index {} out of range", index))
        })?;
        self.push_symbol(branch);
        Ok(())
    }

    /// Pop and return the top symbol.
    pub fn pop_symbol(&mut self) -> SymbolId {
        self.pos -= 1;
        self.stack[self.pos]
    }

    /// The top symbol, without popping.
    pub fn top_symbol(&self) -> SymbolId {
        self.stack[self.pos - 1]
    }

    /// Push a symbol.
    pub fn push_symbol(&mut self, sym: SymbolId) {
        self.ensure_capacity(self.pos + 1);
        self.stack[self.pos] = sym;
        self.pos += 1;
    }

    /// The depth of the stack.
    pub fn depth(&self) -> usize {
        self.pos
    }

    /// Reset to the state just after construction.
    pub fn reset(&mut self) {
        self.pos = 1;
    }

    /// Shorthand for the interned id of a terminal.
    pub fn term(&self, t: Terminal) -> SymbolId {
        self.grammar.terminal(t)
    }

    /// Whether the top symbol is the given terminal.
    pub fn top_is(&self, t: Terminal) -> bool {
        self.grammar.is_terminal(self.top_symbol(), t)
    }

    /// The action payload of a symbol, when it is an action.
    pub fn action_of(&self, id: SymbolId) -> Option<&Action> {
        match self.grammar.symbol(id) {
            Symbol::Action(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Terminal};

    struct NoActions;
    impl ActionHandler for NoActions {
        fn do_action(
            &mut self,
            _input: Option<SymbolId>,
            _top: SymbolId,
        ) -> Result<Outcome, CodecError> {
            Ok(Outcome::Continue)
        }
    }

    fn simple_grammar() -> (Arc<Grammar>, SymbolId) {
        // A sequence of int, string
        let mut g = Grammar::new();
        let int = g.terminal(Terminal::Int);
        let string = g.terminal(Terminal::String);
        let seq = g.seq(vec![int, string]);
        let root = g.root(seq);
        (Arc::new(g), root)
    }

    #[test]
    fn test_advance_matches_in_order() {
        let (g, root) = simple_grammar();
        let int = g.terminal(Terminal::Int);
        let string = g.terminal(Terminal::String);
        let mut parser = Parser::new(g, root);
        let mut handler = NoActions;

        assert_eq!(parser.advance(int, &mut handler).unwrap(), int);
        assert_eq!(parser.advance(string, &mut handler).unwrap(), string);
    }

    #[test]
    fn test_advance_wrong_terminal_fails() {
        let (g, root) = simple_grammar();
        let string = g.terminal(Terminal::String);
        let mut parser = Parser::new(g, root);
        let mut handler = NoActions;

        assert!(matches!(
            parser.advance(string, &mut handler),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_repeater_loops_until_end() {
        let mut g = Grammar::new();
        let long = g.terminal(Terminal::Long);
        let rep = g.repeat(Terminal::ArrayEnd, vec![long]);
        let array_start = g.terminal(Terminal::ArrayStart);
        let seq = g.seq(vec![array_start, rep]);
        let root = g.root(seq);
        let array_end = g.terminal(Terminal::ArrayEnd);

        let g = Arc::new(g);
        let mut parser = Parser::new(g.clone(), root);
        let mut handler = NoActions;

        assert_eq!(
            parser.advance(array_start, &mut handler).unwrap(),
            array_start
        );
        // Three items, then the end
        for _ in 0..3 {
            assert_eq!(parser.advance(long, &mut handler).unwrap(), long);
        }
        assert_eq!(parser.advance(array_end, &mut handler).unwrap(), array_end);
    }

    #[test]
    fn test_stack_grows() {
        // Deeply nested sequences force repeated growth
        let mut g = Grammar::new();
        let int = g.terminal(Terminal::Int);
        let mut inner = g.seq(vec![int]);
        for _ in 0..100 {
            inner = g.seq(vec![inner, int]);
        }
        let root = g.root(inner);
        let g = Arc::new(g);
        let mut parser = Parser::new(g, root);
        let mut handler = NoActions;

        for _ in 0..101 {
            assert!(parser.advance(int, &mut handler).is_ok());
        }
    }
}
