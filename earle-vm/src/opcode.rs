// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.
//!
//! Each instruction is one opcode byte followed by its operands. The format
//! string of an opcode (`"PUSH_INT $int"`) names the mnemonic and the operand
//! layout; the disassembler and the operand decoder both read it.

/// Operand encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// 4-byte little-endian `i32`.
    Int,
    /// 4-byte little-endian `f32`.
    Float,
    /// NUL-terminated UTF-8.
    String,
}

/// Bytecode instructions for the Earle VM.
///
/// Jump offsets are relative to the address of the next instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Calls
    // =========================================================================
    /// args.., callee -> result
    Call = 0x01,
    /// target, args.., callee -> result
    CallOnTarget = 0x02,
    /// args.., callee -> undefined; runs the callee as a new chain.
    Thread = 0x03,
    /// target, args.., callee -> undefined
    ThreadOnTarget = 0x04,

    // =========================================================================
    // Variables
    // =========================================================================
    /// reference, value ->
    Write = 0x05,
    /// reference -> value
    Read = 0x06,
    /// container, index, value ->
    WriteIndex = 0x07,
    /// container, value ->
    WriteField = 0x08,

    // =========================================================================
    // Constants & Stack
    // =========================================================================
    PushInteger = 0x09,
    PushFloat = 0x0a,
    PushString = 0x0b,
    PushReference = 0x0c,
    PushFunction = 0x0d,
    PushNull = 0x0e,
    PushArray = 0x0f,
    /// x, y -> vector
    PushVector2 = 0x10,
    /// x, y, z -> vector
    PushVector3 = 0x11,
    Pop = 0x12,
    Duplicate = 0x13,

    // =========================================================================
    // Scopes
    // =========================================================================
    PushScope = 0x14,
    PopScope = 0x15,

    // =========================================================================
    // Operators
    // =========================================================================
    Not = 0x16,
    Negate = 0x17,
    BitwiseNot = 0x18,
    Add = 0x19,
    Subtract = 0x1a,
    Multiply = 0x1b,
    Divide = 0x1c,
    Modulo = 0x1d,
    BitwiseAnd = 0x1e,
    BitwiseOr = 0x1f,
    BitwiseXor = 0x20,
    ShiftLeft = 0x21,
    ShiftRight = 0x22,
    Equal = 0x23,
    NotEqual = 0x24,
    Less = 0x25,
    LessOrEqual = 0x26,
    Greater = 0x27,
    GreaterOrEqual = 0x28,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Pops the condition.
    JumpIfFalse = 0x29,
    /// Pops the condition.
    JumpIfTrue = 0x2a,
    Jump = 0x2b,
    Return = 0x2c,

    // =========================================================================
    // Containers
    // =========================================================================
    /// container, index -> value
    DereferenceIndex = 0x2d,
    /// container -> value
    DereferenceField = 0x2e,

    // =========================================================================
    // Stack
    // =========================================================================
    /// a, b -> a, b, a, b
    Duplicate2 = 0x2f,
}

impl OpCode {
    pub const ALL: [OpCode; 47] = [
        OpCode::Call,
        OpCode::CallOnTarget,
        OpCode::Thread,
        OpCode::ThreadOnTarget,
        OpCode::Write,
        OpCode::Read,
        OpCode::WriteIndex,
        OpCode::WriteField,
        OpCode::PushInteger,
        OpCode::PushFloat,
        OpCode::PushString,
        OpCode::PushReference,
        OpCode::PushFunction,
        OpCode::PushNull,
        OpCode::PushArray,
        OpCode::PushVector2,
        OpCode::PushVector3,
        OpCode::Pop,
        OpCode::Duplicate,
        OpCode::PushScope,
        OpCode::PopScope,
        OpCode::Not,
        OpCode::Negate,
        OpCode::BitwiseNot,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Modulo,
        OpCode::BitwiseAnd,
        OpCode::BitwiseOr,
        OpCode::BitwiseXor,
        OpCode::ShiftLeft,
        OpCode::ShiftRight,
        OpCode::Equal,
        OpCode::NotEqual,
        OpCode::Less,
        OpCode::LessOrEqual,
        OpCode::Greater,
        OpCode::GreaterOrEqual,
        OpCode::JumpIfFalse,
        OpCode::JumpIfTrue,
        OpCode::Jump,
        OpCode::Return,
        OpCode::DereferenceIndex,
        OpCode::DereferenceField,
        OpCode::Duplicate2,
    ];

    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        let index = usize::from(byte).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Mnemonic followed by `$int`, `$float` or `$string` operand slots.
    pub fn format(&self) -> &'static str {
        match self {
            OpCode::Call => "CALL $int",
            OpCode::CallOnTarget => "CALL_T $int",
            OpCode::Thread => "THREAD $int",
            OpCode::ThreadOnTarget => "THREAD_T $int",
            OpCode::Write => "WRITE",
            OpCode::Read => "READ",
            OpCode::WriteIndex => "WRITE_IDX",
            OpCode::WriteField => "WRITE_FIELD $string",
            OpCode::PushInteger => "PUSH_INT $int",
            OpCode::PushFloat => "PUSH_FLOAT $float",
            OpCode::PushString => "PUSH_STR $string",
            OpCode::PushReference => "PUSH_REF $string",
            OpCode::PushFunction => "PUSH_FUNC $string",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushArray => "PUSH_ARRAY",
            OpCode::PushVector2 => "PUSH_VEC2",
            OpCode::PushVector3 => "PUSH_VEC3",
            OpCode::Pop => "POP",
            OpCode::Duplicate => "DUP",
            OpCode::PushScope => "PUSH_SCOPE",
            OpCode::PopScope => "POP_SCOPE",
            OpCode::Not => "NOT",
            OpCode::Negate => "NEG",
            OpCode::BitwiseNot => "BNOT",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUB",
            OpCode::Multiply => "MUL",
            OpCode::Divide => "DIV",
            OpCode::Modulo => "MOD",
            OpCode::BitwiseAnd => "BAND",
            OpCode::BitwiseOr => "BOR",
            OpCode::BitwiseXor => "BXOR",
            OpCode::ShiftLeft => "SHL",
            OpCode::ShiftRight => "SHR",
            OpCode::Equal => "EQ",
            OpCode::NotEqual => "NE",
            OpCode::Less => "LT",
            OpCode::LessOrEqual => "LE",
            OpCode::Greater => "GT",
            OpCode::GreaterOrEqual => "GE",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE $int",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE $int",
            OpCode::Jump => "JUMP $int",
            OpCode::Return => "RET",
            OpCode::DereferenceIndex => "DEREF_IDX",
            OpCode::DereferenceField => "DEREF_FIELD $string",
            OpCode::Duplicate2 => "DUP2",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        self.format().split(' ').next().unwrap_or_default()
    }

    /// Operand layout, read from the format string.
    pub fn operands(&self) -> impl Iterator<Item = OperandKind> {
        self.format().split(' ').skip(1).filter_map(|slot| match slot {
            "$int" => Some(OperandKind::Int),
            "$float" => Some(OperandKind::Float),
            "$string" => Some(OperandKind::String),
            _ => None,
        })
    }

    /// Returns true for the three jump instructions.
    #[inline]
    pub fn is_jump(&self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue)
    }

    /// Returns true for binary operators dispatched through the operator table.
    #[inline]
    pub fn is_binary_operator(&self) -> bool {
        (OpCode::Add as u8..=OpCode::GreaterOrEqual as u8).contains(&(*self as u8))
    }

    /// Returns true for unary operators dispatched through the operator table.
    #[inline]
    pub fn is_unary_operator(&self) -> bool {
        matches!(self, OpCode::Not | OpCode::Negate | OpCode::BitwiseNot)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_byte(op.to_byte()), Some(op));
        }
        assert_eq!(OpCode::from_byte(0), None);
        assert_eq!(OpCode::from_byte(0x2f), Some(OpCode::Duplicate2));
        assert_eq!(OpCode::from_byte(0x30), None);
    }

    #[test]
    fn test_operands_from_format() {
        assert_eq!(OpCode::PushInteger.operands().collect::<Vec<_>>(), vec![OperandKind::Int]);
        assert_eq!(OpCode::PushFloat.operands().collect::<Vec<_>>(), vec![OperandKind::Float]);
        assert_eq!(OpCode::WriteField.operands().collect::<Vec<_>>(), vec![OperandKind::String]);
        assert_eq!(OpCode::Return.operands().count(), 0);
        assert_eq!(OpCode::JumpIfFalse.mnemonic(), "JUMP_IF_FALSE");
    }

    #[test]
    fn test_operator_classes() {
        assert!(OpCode::Add.is_binary_operator());
        assert!(OpCode::GreaterOrEqual.is_binary_operator());
        assert!(!OpCode::JumpIfFalse.is_binary_operator());
        assert!(!OpCode::BitwiseNot.is_binary_operator());
        assert!(OpCode::Negate.is_unary_operator());
    }
}
