// earle-parser - Grammar rule text compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiles rule text such as ``"`if` ( EXPRESSION ) OPTIONAL STATEMENT"`` into
//! [`RuleElement`]s. Rule text is tokenized with the ordinary Earle lexer.

use crate::error::GrammarError;
use crate::grammar::element::{LiteralElement, RuleElement};
use crate::lexer::{Lexer, Token, TokenKind};

pub fn compile_rule(rule: &str, text: &str) -> Result<Vec<RuleElement>, GrammarError> {
    let tokens = Lexer::tokenize(text);
    let mut elements = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let (element, next) = compile_element(rule, &tokens, index)?;
        elements.push(element);
        index = next;
    }
    if elements.is_empty() {
        return Err(GrammarError::EmptyRule {
            rule: rule.to_string(),
        });
    }
    Ok(elements)
}

/// Compile the element starting at `index`, returning it and the index after it.
fn compile_element(
    rule: &str,
    tokens: &[Token],
    index: usize,
) -> Result<(RuleElement, usize), GrammarError> {
    let token = &tokens[index];
    match token.kind {
        TokenKind::Identifier if token.value.eq_ignore_ascii_case("OPTIONAL") => {
            if index + 1 >= tokens.len() {
                return Err(GrammarError::DanglingOptional {
                    rule: rule.to_string(),
                });
            }
            let (inner, next) = compile_element(rule, tokens, index + 1)?;
            Ok((RuleElement::Optional(Box::new(inner)), next))
        }
        TokenKind::Identifier => match TokenKind::from_type_name(&token.value) {
            Some(kind) => compile_type_chain(rule, tokens, index, kind),
            None => Ok((RuleElement::Embed(token.value.to_ascii_uppercase()), index + 1)),
        },
        TokenKind::StringLiteral => {
            let literals: Vec<LiteralElement> = Lexer::tokenize(&token.value)
                .into_iter()
                .map(|t| LiteralElement::exact(t.kind, t.value))
                .collect();
            if literals.is_empty() {
                return Err(GrammarError::EmptyRule {
                    rule: rule.to_string(),
                });
            }
            Ok((sequence(literals), index + 1))
        }
        TokenKind::Token if token.value == "`" => compile_backticks(rule, tokens, index),
        TokenKind::Token if token.value == "|" => Err(GrammarError::StrayAlternation {
            rule: rule.to_string(),
        }),
        TokenKind::Token => Ok((
            RuleElement::Literal(LiteralElement::exact(TokenKind::Token, token.value.clone())),
            index + 1,
        )),
        TokenKind::NumberLiteral => Err(GrammarError::NumberLiteral {
            rule: rule.to_string(),
            value: token.value.clone(),
        }),
    }
}

// IDENTIFIER | STRING_LITERAL | ...
fn compile_type_chain(
    rule: &str,
    tokens: &[Token],
    index: usize,
    first: TokenKind,
) -> Result<(RuleElement, usize), GrammarError> {
    let mut kinds = vec![first];
    let mut next = index + 1;
    while tokens.get(next).is_some_and(|t| t.is_symbol("|")) {
        let Some(name) = tokens.get(next + 1) else {
            return Err(GrammarError::StrayAlternation {
                rule: rule.to_string(),
            });
        };
        let kind = TokenKind::from_type_name(&name.value)
            .filter(|_| name.kind == TokenKind::Identifier)
            .ok_or_else(|| GrammarError::UnknownTokenType {
                rule: rule.to_string(),
                name: name.value.clone(),
            })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
        next += 2;
    }
    Ok((RuleElement::Literal(LiteralElement::of_kinds(kinds)), next))
}

fn compile_backticks(
    rule: &str,
    tokens: &[Token],
    index: usize,
) -> Result<(RuleElement, usize), GrammarError> {
    let mut literals = Vec::new();
    let mut next = index + 1;
    loop {
        match tokens.get(next) {
            None => {
                return Err(GrammarError::UnbalancedBacktick {
                    rule: rule.to_string(),
                });
            }
            Some(token) if token.is_symbol("`") => break,
            Some(token) if token.kind == TokenKind::Identifier => {
                literals.push(LiteralElement::exact(TokenKind::Identifier, token.value.clone()));
            }
            Some(token) => {
                return Err(GrammarError::BacktickContent {
                    rule: rule.to_string(),
                    value: token.value.clone(),
                });
            }
        }
        next += 1;
    }
    if literals.is_empty() {
        return Err(GrammarError::EmptyRule {
            rule: rule.to_string(),
        });
    }
    Ok((sequence(literals), next + 1))
}

fn sequence(mut literals: Vec<LiteralElement>) -> RuleElement {
    if literals.len() == 1 {
        RuleElement::Literal(literals.remove(0))
    } else {
        RuleElement::And(literals.into_iter().map(RuleElement::Literal).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(text: &str) -> Result<Vec<RuleElement>, GrammarError> {
        compile_rule("TEST", text)
    }

    #[test]
    fn test_quoted_text_becomes_token_sequence() {
        assert_eq!(
            compile("\"==\"").unwrap(),
            vec![RuleElement::And(vec![
                RuleElement::Literal(LiteralElement::exact(TokenKind::Token, "=")),
                RuleElement::Literal(LiteralElement::exact(TokenKind::Token, "=")),
            ])]
        );
    }

    #[test]
    fn test_type_chain() {
        assert_eq!(
            compile("NUMBER_LITERAL | STRING_LITERAL").unwrap(),
            vec![RuleElement::Literal(LiteralElement::of_kinds(vec![
                TokenKind::NumberLiteral,
                TokenKind::StringLiteral,
            ]))]
        );
    }

    #[test]
    fn test_optional_wraps_next_element() {
        assert_eq!(
            compile("OPTIONAL expression ;").unwrap(),
            vec![
                RuleElement::Optional(Box::new(RuleElement::Embed("EXPRESSION".to_string()))),
                RuleElement::Literal(LiteralElement::exact(TokenKind::Token, ";")),
            ]
        );
    }

    #[test]
    fn test_backticks() {
        assert_eq!(
            compile("`else if`").unwrap(),
            vec![RuleElement::And(vec![
                RuleElement::Literal(LiteralElement::exact(TokenKind::Identifier, "else")),
                RuleElement::Literal(LiteralElement::exact(TokenKind::Identifier, "if")),
            ])]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(compile("A 1"), Err(GrammarError::NumberLiteral { .. })));
        assert!(matches!(compile("A | B"), Err(GrammarError::StrayAlternation { .. })));
        assert!(matches!(
            compile("IDENTIFIER | EXPRESSION"),
            Err(GrammarError::UnknownTokenType { .. })
        ));
        assert!(matches!(compile("A OPTIONAL"), Err(GrammarError::DanglingOptional { .. })));
        assert!(matches!(compile("`if"), Err(GrammarError::UnbalancedBacktick { .. })));
        assert!(matches!(compile("   "), Err(GrammarError::EmptyRule { .. })));
    }
}
