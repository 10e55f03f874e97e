// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the bytecode compiler.

use earle_parser::{GrammarError, ParseError};
use thiserror::Error;

use crate::opcode::OpCode;

/// Error during compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("{file}: function '{name}' with {arity} parameters is declared twice")]
    DuplicateFunction {
        file: String,
        name: String,
        arity: usize,
    },

    #[error("invalid bytecode in '{function}': {message}")]
    InvalidBytecode { function: String, message: String },
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Loop context for compiling `break` and `continue`.
#[derive(Debug, Clone, Default)]
pub struct LoopContext {
    /// Scope depth when the loop started; exits pop everything above it.
    pub scope_depth: usize,
    /// Operand offsets of `break` jumps awaiting the loop end.
    pub breaks: Vec<usize>,
    /// Operand offsets of `continue` jumps awaiting the continue target.
    pub continues: Vec<usize>,
}

impl LoopContext {
    pub fn new(scope_depth: usize) -> Self {
        LoopContext {
            scope_depth,
            ..Self::default()
        }
    }
}

/// Binary operators in source form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    /// Two-character operators.
    pub fn from_pair(first: &str, second: &str) -> Option<BinaryOperator> {
        Some(match (first, second) {
            ("|", "|") => BinaryOperator::Or,
            ("&", "&") => BinaryOperator::And,
            ("=", "=") => BinaryOperator::Equal,
            ("!", "=") => BinaryOperator::NotEqual,
            ("<", "=") => BinaryOperator::LessOrEqual,
            (">", "=") => BinaryOperator::GreaterOrEqual,
            ("<", "<") => BinaryOperator::ShiftLeft,
            (">", ">") => BinaryOperator::ShiftRight,
            _ => return None,
        })
    }

    /// Single-character operators.
    pub fn from_symbol(symbol: &str) -> Option<BinaryOperator> {
        Some(match symbol {
            "|" => BinaryOperator::BitOr,
            "^" => BinaryOperator::BitXor,
            "&" => BinaryOperator::BitAnd,
            "<" => BinaryOperator::Less,
            ">" => BinaryOperator::Greater,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Modulo,
            _ => return None,
        })
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::BitOr => 3,
            BinaryOperator::BitXor => 4,
            BinaryOperator::BitAnd => 5,
            BinaryOperator::Equal | BinaryOperator::NotEqual => 6,
            BinaryOperator::Less
            | BinaryOperator::LessOrEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterOrEqual => 7,
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => 8,
            BinaryOperator::Add | BinaryOperator::Subtract => 9,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 10,
        }
    }

    /// The instruction computing this operator. `&&` and `||` short-circuit
    /// through jumps instead.
    pub fn opcode(&self) -> Option<OpCode> {
        Some(match self {
            BinaryOperator::Or | BinaryOperator::And => return None,
            BinaryOperator::BitOr => OpCode::BitwiseOr,
            BinaryOperator::BitXor => OpCode::BitwiseXor,
            BinaryOperator::BitAnd => OpCode::BitwiseAnd,
            BinaryOperator::Equal => OpCode::Equal,
            BinaryOperator::NotEqual => OpCode::NotEqual,
            BinaryOperator::Less => OpCode::Less,
            BinaryOperator::LessOrEqual => OpCode::LessOrEqual,
            BinaryOperator::Greater => OpCode::Greater,
            BinaryOperator::GreaterOrEqual => OpCode::GreaterOrEqual,
            BinaryOperator::ShiftLeft => OpCode::ShiftLeft,
            BinaryOperator::ShiftRight => OpCode::ShiftRight,
            BinaryOperator::Add => OpCode::Add,
            BinaryOperator::Subtract => OpCode::Subtract,
            BinaryOperator::Multiply => OpCode::Multiply,
            BinaryOperator::Divide => OpCode::Divide,
            BinaryOperator::Modulo => OpCode::Modulo,
        })
    }
}

/// Assignment operators. Compound forms read the target first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    Compound(OpCode),
    Increment,
    Decrement,
}

impl AssignmentOperator {
    /// `op=` forms, keyed by the first character.
    pub fn compound(symbol: &str) -> Option<AssignmentOperator> {
        let op = match symbol {
            "+" => OpCode::Add,
            "-" => OpCode::Subtract,
            "*" => OpCode::Multiply,
            "/" => OpCode::Divide,
            "%" => OpCode::Modulo,
            "&" => OpCode::BitwiseAnd,
            "|" => OpCode::BitwiseOr,
            "^" => OpCode::BitwiseXor,
            _ => return None,
        };
        Some(AssignmentOperator::Compound(op))
    }
}
