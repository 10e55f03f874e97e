// earle-parser - Error types for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use thiserror::Error;

use crate::lexer::{Position, Token};

/// Error compiling grammar rule text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("rule {rule}: number literal '{value}' is not a valid rule element")]
    NumberLiteral { rule: String, value: String },

    #[error("rule {rule}: '|' must join two token type names")]
    StrayAlternation { rule: String },

    #[error("rule {rule}: unknown token type '{name}' in type chain")]
    UnknownTokenType { rule: String, name: String },

    #[error("rule {rule}: OPTIONAL has nothing to wrap")]
    DanglingOptional { rule: String },

    #[error("rule {rule}: unbalanced backtick")]
    UnbalancedBacktick { rule: String },

    #[error("rule {rule}: only identifiers may appear between backticks, found '{value}'")]
    BacktickContent { rule: String, value: String },

    #[error("rule {rule}: rule text is empty")]
    EmptyRule { rule: String },
}

/// Error raised while parsing Earle source. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }

    /// `expected <what>, found <token>`, positioned at the offending token
    /// or at `fallback` when the input ended.
    pub fn expected(what: &str, found: Option<&Token>, fallback: &Position) -> Self {
        match found {
            Some(token) => ParseError::new(
                format!("expected {}, found '{}'", what, token),
                token.position.clone(),
            ),
            None => ParseError::new(
                format!("expected {}, found end of input", what),
                fallback.clone(),
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
