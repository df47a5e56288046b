//! Binary grammar compilation.
//!
//! Compiles a schema into the symbol graph whose terminals follow the
//! binary wire order. Auxiliary payloads (fixed sizes, enum symbol
//! counts, union alternatives) sit directly beneath their terminal and
//! are popped by the read that consumes the terminal.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::grammar::{Action, CompiledGrammar, Grammar, Symbol, SymbolId, Terminal};
use crate::schema::{Schema, SchemaContext};

/// Compile `schema` into a binary grammar.
pub fn binary_grammar(schema: &Schema) -> Result<CompiledGrammar, SchemaError> {
    let context = SchemaContext::from_schema(schema);
    let mut grammar = Grammar::new();
    let mut gen = BinaryGen {
        grammar: &mut grammar,
        context: &context,
        memo: HashMap::new(),
    };
    let datum = gen.generate(schema)?;
    let root = grammar.root(datum);
    Ok(CompiledGrammar {
        grammar: std::sync::Arc::new(grammar),
        root,
    })
}

/// Compile `schema` into symbols inside an existing arena.
///
/// Used by the resolving generator, which embeds writer-shaped skip
/// regions into its own grammar.
pub fn generate_into(
    grammar: &mut Grammar,
    context: &SchemaContext,
    schema: &Schema,
) -> Result<SymbolId, SchemaError> {
    let mut gen = BinaryGen {
        grammar,
        context,
        memo: HashMap::new(),
    };
    gen.generate(schema)
}

struct BinaryGen<'a> {
    grammar: &'a mut Grammar,
    context: &'a SchemaContext,
    /// Forwarding symbols by fully qualified name, inserted before
    /// recursing so cyclic records stay finite
    memo: HashMap<String, SymbolId>,
}

impl BinaryGen<'_> {
    fn generate(&mut self, schema: &Schema) -> Result<SymbolId, SchemaError> {
        // Follow references and strip logical bindings down to the wire
        // shape
        let mut schema = self.context.deref(schema)?;
        loop {
            match schema {
                Schema::Logical(l) => schema = l.base.as_ref(),
                Schema::Named(_) => schema = self.context.deref(schema)?,
                _ => break,
            }
        }
        match schema {
            Schema::Null => Ok(self.grammar.terminal(Terminal::Null)),
            Schema::Boolean => Ok(self.grammar.terminal(Terminal::Boolean)),
            Schema::Int => Ok(self.grammar.terminal(Terminal::Int)),
            Schema::Long => Ok(self.grammar.terminal(Terminal::Long)),
            Schema::Float => Ok(self.grammar.terminal(Terminal::Float)),
            Schema::Double => Ok(self.grammar.terminal(Terminal::Double)),
            Schema::Bytes => Ok(self.grammar.terminal(Terminal::Bytes)),
            Schema::String => Ok(self.grammar.terminal(Terminal::String)),

            Schema::Fixed(f) => {
                let check = self.grammar.action(Action::SizeCheck(f.size));
                let fixed = self.grammar.terminal(Terminal::Fixed);
                Ok(self.grammar.seq(vec![fixed, check]))
            }

            Schema::Enum(e) => {
                let check = self.grammar.action(Action::SizeCheck(e.symbols.len()));
                let term = self.grammar.terminal(Terminal::Enum);
                Ok(self.grammar.seq(vec![term, check]))
            }

            Schema::Array(items) => {
                let item = self.generate(items)?;
                let rep = self.grammar.repeat(Terminal::ArrayEnd, vec![item]);
                let start = self.grammar.terminal(Terminal::ArrayStart);
                Ok(self.grammar.seq(vec![start, rep]))
            }

            Schema::Map(values) => {
                let key = self.grammar.terminal(Terminal::String);
                let value = self.generate(values)?;
                let rep = self.grammar.repeat(Terminal::MapEnd, vec![key, value]);
                let start = self.grammar.terminal(Terminal::MapStart);
                Ok(self.grammar.seq(vec![start, rep]))
            }

            Schema::Union(branches) => {
                let mut labels = Vec::with_capacity(branches.len());
                let mut symbols = Vec::with_capacity(branches.len());
                for branch in branches {
                    labels.push(branch.branch_label());
                    symbols.push(self.generate(branch)?);
                }
                let alt = self.grammar.alt(labels, symbols);
                let union = self.grammar.terminal(Terminal::Union);
                Ok(self.grammar.seq(vec![union, alt]))
            }

            Schema::Record(record) => {
                let fullname = record.fullname();
                if let Some(&forward) = self.memo.get(&fullname) {
                    return Ok(forward);
                }
                let forward = self.grammar.placeholder();
                self.memo.insert(fullname, forward);

                let mut exec = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    exec.push(self.generate(&field.schema)?);
                }
                exec.reverse();
                // Placeholder becomes the record's production (stored
                // reversed, so the reversed exec order is storage order)
                self.grammar.patch(forward, Symbol::Sequence(exec));
                Ok(forward)
            }

            // Stripped above
            Schema::Named(name) => Err(SchemaError::UnresolvedName(name.clone())),
            Schema::Logical(_) => unreachable!("logical bindings stripped above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    #[test]
    fn test_primitive_grammar_is_terminal() {
        let compiled = binary_grammar(&Schema::Int).unwrap();
        assert!(matches!(
            compiled.grammar.symbol(compiled.grammar.terminal(Terminal::Int)),
            Symbol::Terminal(Terminal::Int)
        ));
    }

    #[test]
    fn test_recursive_record_compiles() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "value", "type": "int"},
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }"#,
        )
        .unwrap();

        // Termination is the property under test
        let compiled = binary_grammar(&schema).unwrap();
        assert!(matches!(
            compiled.grammar.symbol(compiled.root),
            Symbol::Root(_)
        ));
    }
}
