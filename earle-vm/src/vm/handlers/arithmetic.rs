// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operator and vector construction handlers.

use crate::opcode::OpCode;
use crate::value::EarleValue;
use crate::vm::frame::CallFrame;
use crate::vm::{Result, RuntimeError, VM};

impl VM {
    /// Execute a unary or binary operator through the operator table.
    pub(crate) fn execute_arithmetic(&self, frame: &mut CallFrame, op: OpCode) -> Result<()> {
        let result = if op.is_unary_operator() {
            let operand = frame.stack.pop()?;
            self.operators.evaluate_unary(op, &operand)
        } else if op.is_binary_operator() {
            let right = frame.stack.pop()?;
            let left = frame.stack.pop()?;
            self.operators.evaluate_binary(op, &left, &right)
        } else {
            return Err(RuntimeError::InvalidBytecode(format!(
                "execute_arithmetic: unexpected opcode {}",
                op
            )));
        };
        frame.stack.push(result);
        Ok(())
    }

    /// `PUSH_VEC2` / `PUSH_VEC3`. A non-numeric component makes the whole
    /// vector undefined.
    pub(crate) fn execute_vector(&self, frame: &mut CallFrame, op: OpCode) -> Result<()> {
        let count = match op {
            OpCode::PushVector2 => 2,
            OpCode::PushVector3 => 3,
            _ => {
                return Err(RuntimeError::InvalidBytecode(format!(
                    "execute_vector: unexpected opcode {}",
                    op
                )));
            }
        };
        let components: Option<Vec<f32>> = frame
            .stack
            .pop_n(count)?
            .iter()
            .map(EarleValue::as_number)
            .collect();
        let value = match components.as_deref() {
            Some(&[x, y]) => EarleValue::Vector2([x, y]),
            Some(&[x, y, z]) => EarleValue::Vector3([x, y, z]),
            _ => EarleValue::Undefined,
        };
        frame.stack.push(value);
        Ok(())
    }
}
