// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operand stack of a call frame.

use crate::value::EarleValue;

use super::{Result, RuntimeError};

#[derive(Debug, Clone, Default)]
pub struct ValueStack {
    values: Vec<EarleValue>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(16),
        }
    }

    #[inline]
    pub fn push(&mut self, value: EarleValue) {
        self.values.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<EarleValue> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop `count` values, returned in push order.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<EarleValue>> {
        let start = self
            .values
            .len()
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.values.split_off(start))
    }

    /// `distance` is the offset from the top (0 = top).
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&EarleValue> {
        self.values
            .len()
            .checked_sub(distance + 1)
            .and_then(|index| self.values.get(index))
            .ok_or(RuntimeError::StackUnderflow)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_n_keeps_order() {
        let mut stack = ValueStack::new();
        for n in 1..=4 {
            stack.push(EarleValue::Integer(n));
        }
        let top = stack.pop_n(2).unwrap();
        assert_eq!(top, vec![EarleValue::Integer(3), EarleValue::Integer(4)]);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek(0).unwrap(), &EarleValue::Integer(2));
    }

    #[test]
    fn test_underflow() {
        let mut stack = ValueStack::new();
        assert_eq!(stack.pop(), Err(RuntimeError::StackUnderflow));
        assert_eq!(stack.pop_n(1), Err(RuntimeError::StackUnderflow));
        assert!(stack.peek(0).is_err());
        assert_eq!(stack.pop_n(0), Ok(Vec::new()));
    }
}
