// earle-parser - Grammar rule table
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::collections::HashMap;

use tracing::trace;

use crate::error::GrammarError;
use crate::grammar::compile::compile_rule;
use crate::grammar::element::GrammarRule;

/// Named productions. Rules sharing a name are alternatives, tried in the
/// order they were added.
#[derive(Debug, Clone, Default)]
pub struct GrammarRuleTable {
    rules: HashMap<String, Vec<GrammarRule>>,
    statement_order: Vec<String>,
}

impl GrammarRuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `text` and append it as an alternative of `name`.
    pub fn add_rule(&mut self, name: &str, is_statement: bool, text: &str) -> Result<(), GrammarError> {
        let name = name.to_ascii_uppercase();
        let elements = compile_rule(&name, text)?;
        trace!(rule = %name, text, "grammar rule added");
        if is_statement && !self.statement_order.contains(&name) {
            self.statement_order.push(name.clone());
        }
        self.rules.entry(name.clone()).or_default().push(GrammarRule {
            name,
            is_statement,
            elements,
        });
        Ok(())
    }

    /// Alternatives under `name`; empty when the name is unknown.
    pub fn rules(&self, name: &str) -> &[GrammarRule] {
        let found = match self.rules.get(name) {
            Some(rules) => Some(rules),
            None => self.rules.get(&name.to_ascii_uppercase()),
        };
        found.map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.rules(name).is_empty()
    }

    /// Statement rule names in the order they were first declared.
    pub fn statement_rules(&self) -> impl Iterator<Item = &str> {
        self.statement_order.iter().map(String::as_str)
    }

    /// Total number of alternatives across all names.
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let mut table = GrammarRuleTable::new();
        table.add_rule("operand", false, "NUMBER_LITERAL").unwrap();
        assert_eq!(table.rules("OPERAND").len(), 1);
        assert_eq!(table.rules("Operand").len(), 1);
        assert!(table.rules("missing").is_empty());
    }

    #[test]
    fn test_statement_order_is_first_declaration() {
        let mut table = GrammarRuleTable::new();
        table.add_rule("B", true, ";").unwrap();
        table.add_rule("A", true, "{").unwrap();
        table.add_rule("B", true, "`b`").unwrap();
        table.add_rule("C", false, "IDENTIFIER").unwrap();
        assert_eq!(table.statement_rules().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(table.len(), 4);
    }
}
