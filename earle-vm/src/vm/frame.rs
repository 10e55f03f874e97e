// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use crate::chunk::{EarleFunction, LineInfo, read_f32, read_i32, read_str};
use crate::opcode::OpCode;
use crate::value::EarleValue;

use super::scope::ScopeStack;
use super::stack::ValueStack;
use super::{Result, RuntimeError};

/// Execution state of one script function call.
///
/// A frame owns its operand stack and scopes, so a suspended frame can be
/// stored and continued later exactly where it stopped.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub function: Rc<EarleFunction>,
    /// Offset of the next instruction.
    pub ip: usize,
    pub stack: ValueStack,
    pub scopes: ScopeStack,
    /// What `self` refers to.
    pub target: EarleValue,
}

impl CallFrame {
    /// A frame at the start of `function` with its parameters bound to `args`.
    pub fn new(function: Rc<EarleFunction>, args: Vec<EarleValue>, target: EarleValue) -> Self {
        let bindings = function.parameters.iter().cloned().zip(args);
        let scopes = ScopeStack::with_bindings(bindings);
        CallFrame {
            function,
            ip: 0,
            stack: ValueStack::new(),
            scopes,
            target,
        }
    }

    fn code(&self) -> &[u8] {
        self.function.chunk.code()
    }

    fn truncated(&self, what: &str) -> RuntimeError {
        RuntimeError::InvalidBytecode(format!(
            "truncated {} at {} in {}",
            what,
            self.ip,
            self.function.qualified_name()
        ))
    }

    pub fn read_op(&mut self) -> Result<OpCode> {
        let byte = *self.code().get(self.ip).ok_or_else(|| self.truncated("instruction"))?;
        let op = OpCode::from_byte(byte).ok_or_else(|| {
            RuntimeError::InvalidBytecode(format!("unknown opcode 0x{:02x} at {}", byte, self.ip))
        })?;
        self.ip += 1;
        Ok(op)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let value = read_i32(self.code(), self.ip).ok_or_else(|| self.truncated("int operand"))?;
        self.ip += 4;
        Ok(value)
    }

    pub fn read_float(&mut self) -> Result<f32> {
        let value = read_f32(self.code(), self.ip).ok_or_else(|| self.truncated("float operand"))?;
        self.ip += 4;
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let (text, len) = read_str(self.code(), self.ip)
            .map(|(text, len)| (text.to_string(), len))
            .ok_or_else(|| self.truncated("string operand"))?;
        self.ip += len;
        Ok(text)
    }

    /// Move by `delta` bytes from the current instruction pointer.
    pub fn jump(&mut self, delta: i32) -> Result<()> {
        let target = self.ip as i64 + i64::from(delta);
        if target < 0 || target as usize > self.code().len() {
            return Err(RuntimeError::InvalidBytecode(format!(
                "jump to {} outside {}",
                target,
                self.function.qualified_name()
            )));
        }
        self.ip = target as usize;
        Ok(())
    }

    /// `file::function line:column` of the instruction at `offset`.
    pub fn location(&self, offset: usize) -> String {
        let LineInfo { line, column } = self
            .function
            .chunk
            .get_line_info(offset)
            .unwrap_or_default();
        format!("{} {}:{}", self.function.qualified_name(), line, column)
    }
}
