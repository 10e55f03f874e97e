// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode chunks and compiled functions.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::opcode::{OpCode, OperandKind};

/// Debug information for a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineInfo {
    /// Source line number (1-indexed).
    pub line: u32,
    /// Source column number (1-indexed).
    pub column: u32,
}

impl LineInfo {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Float(f32),
    String(String),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Float(x) => write!(f, "{:?}", x),
            Operand::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub op: OpCode,
    pub operands: Vec<Operand>,
    /// Offset of the following instruction.
    pub next: usize,
}

impl Instruction {
    /// Absolute target of a jump instruction.
    pub fn jump_target(&self) -> Option<usize> {
        match (self.op.is_jump(), self.operands.first()) {
            (true, Some(Operand::Int(delta))) => {
                usize::try_from(self.next as i64 + i64::from(*delta)).ok()
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04} {}", self.offset, self.op.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// Read a little-endian `i32` at `offset`.
pub fn read_i32(code: &[u8], offset: usize) -> Option<i32> {
    let bytes: [u8; 4] = code.get(offset..offset + 4)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}

/// Read a little-endian `f32` at `offset`.
pub fn read_f32(code: &[u8], offset: usize) -> Option<f32> {
    let bytes: [u8; 4] = code.get(offset..offset + 4)?.try_into().ok()?;
    Some(f32::from_le_bytes(bytes))
}

/// Read a NUL-terminated string at `offset`, returning it and its encoded length.
pub fn read_str(code: &[u8], offset: usize) -> Option<(&str, usize)> {
    let rest = code.get(offset..)?;
    let end = rest.iter().position(|&b| b == 0)?;
    let text = std::str::from_utf8(&rest[..end]).ok()?;
    Some((text, end + 1))
}

/// A chunk of bytecode with its debug information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    /// Source location of each instruction, keyed by offset, in offset order.
    lines: Vec<(usize, LineInfo)>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Get the current instruction offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit an opcode with source location.
    pub fn emit_op(&mut self, op: OpCode, line_info: LineInfo) {
        self.lines.push((self.code.len(), line_info));
        self.code.push(op.to_byte());
    }

    pub fn emit_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f32(&mut self, value: f32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_str(&mut self, value: &str) {
        self.code.extend_from_slice(value.as_bytes());
        self.code.push(0);
    }

    /// Overwrite the `i32` operand at `offset`.
    pub fn patch_i32(&mut self, offset: usize, value: i32) {
        match self.code.get_mut(offset..offset + 4) {
            Some(slot) => slot.copy_from_slice(&value.to_le_bytes()),
            None => debug_assert!(false, "patch_i32 out of range at {}", offset),
        }
    }

    /// Append another chunk. Relative jumps inside it stay valid.
    pub fn append(&mut self, other: &Chunk) {
        let base = self.code.len();
        self.code.extend_from_slice(&other.code);
        self.lines
            .extend(other.lines.iter().map(|(offset, info)| (base + offset, *info)));
    }

    /// Get the source location for the instruction containing `offset`.
    pub fn get_line_info(&self, offset: usize) -> Option<LineInfo> {
        let index = self.lines.partition_point(|(start, _)| *start <= offset);
        index.checked_sub(1).map(|i| self.lines[i].1)
    }

    /// Decode the instruction at `offset`.
    pub fn decode(&self, offset: usize) -> Result<Instruction, String> {
        let byte = *self
            .code
            .get(offset)
            .ok_or_else(|| format!("offset {} is past the end of the chunk", offset))?;
        let op = OpCode::from_byte(byte)
            .ok_or_else(|| format!("unknown opcode 0x{:02x} at {}", byte, offset))?;
        let mut cursor = offset + 1;
        let mut operands = Vec::new();
        for kind in op.operands() {
            let truncated = || format!("truncated {} operand at {}", op.mnemonic(), cursor);
            match kind {
                OperandKind::Int => {
                    operands.push(Operand::Int(read_i32(&self.code, cursor).ok_or_else(truncated)?));
                    cursor += 4;
                }
                OperandKind::Float => {
                    operands.push(Operand::Float(read_f32(&self.code, cursor).ok_or_else(truncated)?));
                    cursor += 4;
                }
                OperandKind::String => {
                    let (text, len) = read_str(&self.code, cursor).ok_or_else(truncated)?;
                    operands.push(Operand::String(text.to_string()));
                    cursor += len;
                }
            }
        }
        Ok(Instruction {
            offset,
            op,
            operands,
            next: cursor,
        })
    }

    /// Decode every instruction in order.
    pub fn instructions(&self) -> Result<Vec<Instruction>, String> {
        let mut instructions = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let instruction = self.decode(offset)?;
            offset = instruction.next;
            instructions.push(instruction);
        }
        Ok(instructions)
    }

    /// Check that the chunk decodes and that every jump lands on an
    /// instruction boundary inside the chunk.
    pub fn verify(&self) -> Result<(), String> {
        let instructions = self.instructions()?;
        let boundaries: Vec<usize> = instructions.iter().map(|i| i.offset).collect();
        for instruction in instructions.iter().filter(|i| i.op.is_jump()) {
            let target = instruction
                .jump_target()
                .ok_or_else(|| format!("jump at {} leaves the chunk", instruction.offset))?;
            if target > self.code.len() {
                return Err(format!("jump at {} leaves the chunk", instruction.offset));
            }
            if target != self.code.len() && boundaries.binary_search(&target).is_err() {
                return Err(format!(
                    "jump at {} lands inside an instruction ({})",
                    instruction.offset, target
                ));
            }
        }
        Ok(())
    }

    /// One instruction per line: `0004 PUSH_INT 3`.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut offset = 0;
        while offset < self.code.len() {
            match self.decode(offset) {
                Ok(instruction) => {
                    let _ = writeln!(out, "{}", instruction);
                    offset = instruction.next;
                }
                Err(message) => {
                    let _ = writeln!(out, "{:04} <{}>", offset, message);
                    break;
                }
            }
        }
        out
    }
}

/// A compiled script function.
#[derive(Debug, Clone, PartialEq)]
pub struct EarleFunction {
    pub name: String,
    /// Logical path of the file that declares the function.
    pub file: Rc<str>,
    pub parameters: Vec<String>,
    pub chunk: Rc<Chunk>,
}

impl EarleFunction {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.file, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> LineInfo {
        LineInfo::new(1, 1)
    }

    #[test]
    fn test_disassemble() {
        let mut chunk = Chunk::new();
        chunk.emit_op(OpCode::PushInteger, line());
        chunk.emit_i32(3);
        chunk.emit_op(OpCode::PushString, line());
        chunk.emit_str("hi");
        chunk.emit_op(OpCode::PushFloat, line());
        chunk.emit_f32(1.5);
        chunk.emit_op(OpCode::Add, line());
        chunk.emit_op(OpCode::Return, line());
        assert_eq!(
            chunk.disassemble(),
            "0000 PUSH_INT 3\n0005 PUSH_STR \"hi\"\n0009 PUSH_FLOAT 1.5\n0014 ADD\n0015 RET\n"
        );
    }

    #[test]
    fn test_decode_matches_encoding() {
        let mut chunk = Chunk::new();
        chunk.emit_op(OpCode::WriteField, line());
        chunk.emit_str("origin");
        chunk.emit_op(OpCode::Jump, line());
        chunk.emit_i32(-12);
        let instructions = chunk.instructions().unwrap();
        assert_eq!(instructions[0].operands, vec![Operand::String("origin".to_string())]);
        assert_eq!(instructions[1].offset, 8);
        assert_eq!(instructions[1].operands, vec![Operand::Int(-12)]);
        assert_eq!(instructions[1].jump_target(), Some(1));
    }

    #[test]
    fn test_verify_rejects_misaligned_jump() {
        let mut chunk = Chunk::new();
        chunk.emit_op(OpCode::PushInteger, line());
        chunk.emit_i32(1);
        chunk.emit_op(OpCode::Jump, line());
        chunk.emit_i32(-10);
        assert_eq!(chunk.verify(), Ok(()));

        let mut bad = Chunk::new();
        bad.emit_op(OpCode::PushInteger, line());
        bad.emit_i32(1);
        bad.emit_op(OpCode::Jump, line());
        bad.emit_i32(-8);
        assert!(bad.verify().is_err());
    }

    #[test]
    fn test_verify_rejects_jump_past_end() {
        let mut chunk = Chunk::new();
        chunk.emit_op(OpCode::Jump, line());
        chunk.emit_i32(1);
        assert!(chunk.verify().is_err());
    }

    #[test]
    fn test_append_shifts_line_info() {
        let mut a = Chunk::new();
        a.emit_op(OpCode::PushNull, LineInfo::new(1, 1));
        let mut b = Chunk::new();
        b.emit_op(OpCode::Pop, LineInfo::new(7, 2));
        a.append(&b);
        assert_eq!(a.get_line_info(1), Some(LineInfo::new(7, 2)));
        assert_eq!(a.get_line_info(0), Some(LineInfo::new(1, 1)));
    }
}
