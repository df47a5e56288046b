//! JSON grammar compilation.
//!
//! A second compilation of the schema that interleaves the structural
//! terminals the JSON codec synchronizes on: object begin/end around
//! records, a field-positioning action plus field-end per field, key
//! markers inside maps, item separators inside arrays and maps, and the
//! union-end terminal that closes a tagged union object.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::grammar::{Action, CompiledGrammar, Grammar, Marker, Symbol, SymbolId, Terminal};
use crate::schema::{Schema, SchemaContext};

/// Compile `schema` into a JSON grammar.
pub fn json_grammar(schema: &Schema) -> Result<CompiledGrammar, SchemaError> {
    let context = SchemaContext::from_schema(schema);
    let mut grammar = Grammar::new();
    let mut gen = JsonGen {
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

struct JsonGen<'a> {
    grammar: &'a mut Grammar,
    context: &'a SchemaContext,
    memo: HashMap<String, SymbolId>,
}

impl JsonGen<'_> {
    fn generate(&mut self, schema: &Schema) -> Result<SymbolId, SchemaError> {
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
                let labels = self.grammar.action(Action::EnumLabels(e.symbols.clone()));
                let term = self.grammar.terminal(Terminal::Enum);
                Ok(self.grammar.seq(vec![term, labels]))
            }

            Schema::Array(items) => {
                let item = self.generate(items)?;
                let item_end = self.grammar.terminal(Terminal::ItemEnd);
                let rep = self.grammar.repeat(Terminal::ArrayEnd, vec![item, item_end]);
                let start = self.grammar.terminal(Terminal::ArrayStart);
                Ok(self.grammar.seq(vec![start, rep]))
            }

            Schema::Map(values) => {
                let key = self.grammar.terminal(Terminal::String);
                let marker = self.grammar.terminal(Terminal::MapKeyMarker);
                let value = self.generate(values)?;
                let item_end = self.grammar.terminal(Terminal::ItemEnd);
                let rep = self
                    .grammar
                    .repeat(Terminal::MapEnd, vec![key, marker, value, item_end]);
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

                let mut exec = Vec::with_capacity(record.fields.len() * 3 + 2);
                exec.push(self.grammar.marker(Marker::RecordStart));
                for field in &record.fields {
                    let adjust = self.grammar.action(Action::FieldAdjust {
                        fname: field.name.clone(),
                        position: field.position,
                        default: field.default.clone(),
                    });
                    exec.push(adjust);
                    exec.push(self.generate(&field.schema)?);
                    exec.push(self.grammar.marker(Marker::FieldEnd));
                }
                exec.push(self.grammar.marker(Marker::RecordEnd));

                exec.reverse();
                self.grammar.patch(forward, Symbol::Sequence(exec));
                Ok(forward)
            }

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
    fn test_record_grammar_has_structural_symbols() {
        let schema = parse_schema(
            r#"{
                "type": "record",
                "name": "Pair",
                "fields": [
                    {"name": "a", "type": "int"},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )
        .unwrap();

        let compiled = json_grammar(&schema).unwrap();
        let root = compiled.grammar.symbol(compiled.root);
        assert!(matches!(root, Symbol::Root(_)));
    }

    #[test]
    fn test_enum_grammar_carries_labels() {
        let schema =
            parse_schema(r#"{"type": "enum", "name": "Suit", "symbols": ["HEART", "SPADE"]}"#)
                .unwrap();
        let compiled = json_grammar(&schema).unwrap();

        let labels_present = (0..compiled.grammar.len()).any(|i| {
            matches!(
                compiled.grammar.symbol(SymbolId::at(i)),
                Symbol::Action(Action::EnumLabels(labels)) if labels == &["HEART", "SPADE"]
            )
        });
        assert!(labels_present);
    }
}
