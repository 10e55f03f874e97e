// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: turns Earle source into one chunk per function.
//!
//! Compilation is a single pass. The grammar matcher is consulted at each
//! decision point and the live token stream is consumed as code is emitted.

pub mod codegen;
pub mod emit;
mod expression;
mod statement;
mod tokens;
pub mod types;

pub use codegen::Compiler;
pub use emit::BytecodeEmitter;
pub use types::{AssignmentOperator, BinaryOperator, CompileError, LoopContext, Result};
