// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexical variable scopes of a call frame.
//!
//! Tables are persistent maps, so snapshotting a suspended frame is cheap.

use im::HashMap;

use crate::value::EarleValue;

/// The variables of one block.
#[derive(Debug, Clone, Default)]
pub struct VariablesTable {
    variables: HashMap<String, EarleValue>,
}

impl VariablesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&EarleValue> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: &str, value: EarleValue) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Nested scopes, innermost last. Never empty.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<VariablesTable>,
}

impl ScopeStack {
    /// A single scope holding `bindings`.
    pub fn with_bindings(bindings: impl IntoIterator<Item = (String, EarleValue)>) -> Self {
        let mut table = VariablesTable::new();
        for (name, value) in bindings {
            table.set(&name, value);
        }
        ScopeStack {
            scopes: vec![table],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(VariablesTable::new());
    }

    /// Close the innermost scope. The function scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look a name up, innermost scope first.
    pub fn get(&self, name: &str) -> Option<&EarleValue> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Update the innermost existing binding, or create one in the innermost
    /// scope.
    pub fn assign(&mut self, name: &str, value: EarleValue) {
        let index = self
            .scopes
            .iter()
            .rposition(|scope| scope.contains(name))
            .unwrap_or(self.scopes.len() - 1);
        self.scopes[index].set(name, value);
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::with_bindings(std::iter::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_updates_outer_binding() {
        let mut scopes = ScopeStack::with_bindings([("a".to_string(), EarleValue::Integer(1))]);
        scopes.push();
        scopes.assign("a", EarleValue::Integer(2));
        scopes.assign("b", EarleValue::Integer(3));
        scopes.pop();
        assert_eq!(scopes.get("a"), Some(&EarleValue::Integer(2)));
        assert_eq!(scopes.get("b"), None);
    }

    #[test]
    fn test_function_scope_survives_extra_pop() {
        let mut scopes = ScopeStack::default();
        scopes.assign("x", EarleValue::Integer(1));
        scopes.pop();
        assert_eq!(scopes.depth(), 1);
        assert_eq!(scopes.get("x"), Some(&EarleValue::Integer(1)));
    }
}
