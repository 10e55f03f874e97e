// earle-parser - Lexer, grammar rules and matcher for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # earle-parser
//!
//! Lexer, token walker, grammar rule table and backtracking matcher for the
//! Earle scripting language. The code generator in `earle-vm` drives these to
//! decide which production applies at each point of the source.

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod walker;

pub use error::{GrammarError, ParseError};
pub use grammar::{
    GrammarMatcher, GrammarRule, GrammarRuleTable, LiteralElement, RuleElement, earle_grammar,
};
pub use lexer::{Checkpoint, Lexer, Position, Token, TokenKind};
pub use walker::TokenWalker;
