// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode emission trait for compilers.
//!
//! Jumps are emitted with a placeholder operand whose offset is returned for
//! patching once the target is known. Offsets are relative to the end of the
//! jump instruction.

use crate::opcode::OpCode;

/// Trait for types that can emit bytecode.
pub trait BytecodeEmitter {
    /// Emit an opcode without operands.
    fn emit(&mut self, op: OpCode);

    fn emit_int(&mut self, op: OpCode, value: i32);

    fn emit_float(&mut self, op: OpCode, value: f32);

    fn emit_string(&mut self, op: OpCode, value: &str);

    fn current_offset(&self) -> usize;

    /// Overwrite the `i32` operand at `at`.
    fn patch_operand(&mut self, at: usize, value: i32);

    /// Emit a jump with a placeholder offset and return the operand offset.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        debug_assert!(op.is_jump(), "emit_jump called with {:?}", op);
        self.emit_int(op, 0);
        self.current_offset() - 4
    }

    /// Point the jump whose operand is at `at` to `target`.
    fn patch_jump_to(&mut self, at: usize, target: usize) {
        let from = at + 4;
        let delta = target as i64 - from as i64;
        self.patch_operand(at, delta as i32);
    }

    /// Point the jump whose operand is at `at` to the current offset.
    fn patch_jump(&mut self, at: usize) {
        let here = self.current_offset();
        self.patch_jump_to(at, here);
    }

    /// Emit an unconditional jump back to `target`.
    fn emit_loop(&mut self, target: usize) {
        let at = self.emit_jump(OpCode::Jump);
        self.patch_jump_to(at, target);
    }

    /// Close `count` scopes before leaving them early.
    fn emit_scope_exit(&mut self, count: usize) {
        for _ in 0..count {
            self.emit(OpCode::PopScope);
        }
    }
}

impl BytecodeEmitter for crate::chunk::Chunk {
    fn emit(&mut self, op: OpCode) {
        self.emit_op(op, Default::default());
    }

    fn emit_int(&mut self, op: OpCode, value: i32) {
        self.emit(op);
        self.emit_i32(value);
    }

    fn emit_float(&mut self, op: OpCode, value: f32) {
        self.emit(op);
        self.emit_f32(value);
    }

    fn emit_string(&mut self, op: OpCode, value: &str) {
        self.emit(op);
        self.emit_str(value);
    }

    fn current_offset(&self) -> usize {
        crate::chunk::Chunk::current_offset(self)
    }

    fn patch_operand(&mut self, at: usize, value: i32) {
        self.patch_i32(at, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;

    #[test]
    fn test_forward_jump_patch() {
        let mut chunk = Chunk::new();
        let at = chunk.emit_jump(OpCode::JumpIfFalse);
        chunk.emit(OpCode::PushNull);
        chunk.emit(OpCode::Pop);
        chunk.patch_jump(at);
        let jump = chunk.decode(0).unwrap();
        assert_eq!(jump.jump_target(), Some(7));
        assert_eq!(chunk.verify(), Ok(()));
    }

    #[test]
    fn test_backward_loop() {
        let mut chunk = Chunk::new();
        let start = chunk.current_offset();
        chunk.emit(OpCode::PushNull);
        chunk.emit(OpCode::Pop);
        chunk.emit_loop(start);
        assert_eq!(chunk.decode(2).unwrap().jump_target(), Some(0));
        assert_eq!(chunk.verify(), Ok(()));
    }
}
