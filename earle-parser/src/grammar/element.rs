// earle-parser - Grammar rule elements
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fmt;

use crate::lexer::{Token, TokenKind};

/// Matches one token by class and, optionally, by exact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralElement {
    pub kinds: Vec<TokenKind>,
    pub value: Option<String>,
}

impl LiteralElement {
    /// Any token of one of `kinds`.
    pub fn of_kinds(kinds: Vec<TokenKind>) -> Self {
        LiteralElement { kinds, value: None }
    }

    /// Exactly the token `value` of class `kind`.
    pub fn exact(kind: TokenKind, value: impl Into<String>) -> Self {
        LiteralElement {
            kinds: vec![kind],
            value: Some(value.into()),
        }
    }

    pub fn accepts(&self, token: &Token) -> bool {
        if !self.kinds.contains(&token.kind) {
            return false;
        }
        match &self.value {
            None => true,
            Some(value) if token.kind == TokenKind::Identifier => {
                value.eq_ignore_ascii_case(&token.value)
            }
            Some(value) => *value == token.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleElement {
    Literal(LiteralElement),
    /// Reference to another rule by (uppercased) name.
    Embed(String),
    Optional(Box<RuleElement>),
    And(Vec<RuleElement>),
}

impl fmt::Display for RuleElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleElement::Literal(LiteralElement {
                value: Some(value), ..
            }) => write!(f, "{:?}", value),
            RuleElement::Literal(LiteralElement { kinds, .. }) => {
                let names: Vec<&str> = kinds.iter().map(TokenKind::type_name).collect();
                f.write_str(&names.join(" | "))
            }
            RuleElement::Embed(name) => f.write_str(name),
            RuleElement::Optional(inner) => write!(f, "OPTIONAL {}", inner),
            RuleElement::And(elements) => {
                let parts: Vec<String> = elements.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(" "))
            }
        }
    }
}

/// One alternative of a named production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarRule {
    pub name: String,
    pub is_statement: bool,
    pub elements: Vec<RuleElement>,
}

impl GrammarRule {
    /// A rule is left-recursive when its first element embeds its own name.
    pub fn is_left_recursive(&self) -> bool {
        matches!(self.elements.first(), Some(RuleElement::Embed(name)) if *name == self.name)
    }
}

impl fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.name)?;
        for element in &self.elements {
            write!(f, " {}", element)?;
        }
        Ok(())
    }
}
