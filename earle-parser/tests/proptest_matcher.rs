// earle-parser - Property-based tests for the lexer and matcher
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the lexer and grammar matcher.
//!
//! - The lexer accepts any input
//! - Matched token counts agree with a hand-written parse of the same input
//! - Matching never moves the caller's lexer

use earle_parser::{GrammarMatcher, GrammarRuleTable, Lexer, TokenKind};
use proptest::prelude::*;

fn sum_grammar() -> GrammarRuleTable {
    let mut table = GrammarRuleTable::new();
    table.add_rule("SUM", false, "SUM + NUMBER_LITERAL").unwrap();
    table.add_rule("SUM", false, "SUM - NUMBER_LITERAL").unwrap();
    table.add_rule("SUM", false, "NUMBER_LITERAL").unwrap();
    table
}

/// Count the tokens of the longest `n (('+'|'-') n)*` prefix.
fn hand_parse(tokens: &[(TokenKind, String)]) -> Option<usize> {
    let is_number = |i: usize| tokens.get(i).is_some_and(|(k, _)| *k == TokenKind::NumberLiteral);
    let is_operator = |i: usize| {
        tokens
            .get(i)
            .is_some_and(|(k, v)| *k == TokenKind::Token && (v == "+" || v == "-"))
    };
    if !is_number(0) {
        return None;
    }
    let mut consumed = 1;
    while is_operator(consumed) && is_number(consumed + 1) {
        consumed += 2;
    }
    Some(consumed)
}

fn arb_sum_source() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("x".to_string()),
    ];
    prop::collection::vec(piece, 0..12).prop_map(|pieces| pieces.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The lexer never fails and never loses non-whitespace characters of
    /// identifier and symbol input.
    #[test]
    fn lexer_accepts_any_input(source in "\\PC*") {
        let _ = Lexer::tokenize(&source);
    }

    #[test]
    fn lexer_preserves_symbol_text(source in "[a-z;(){}+=, \n]*") {
        let joined: String = Lexer::tokenize(&source).into_iter().map(|t| t.value).collect();
        let expected: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert_eq!(joined, expected);
    }

    /// Matched length equals the hand parse.
    #[test]
    fn sum_length_matches_hand_parse(source in arb_sum_source()) {
        let table = sum_grammar();
        let matcher = GrammarMatcher::new(&table);
        let lexer = Lexer::new(&source);
        let tokens: Vec<(TokenKind, String)> =
            Lexer::tokenize(&source).into_iter().map(|t| (t.kind, t.value)).collect();

        prop_assert_eq!(matcher.match_length("SUM", &lexer), hand_parse(&tokens));
        prop_assert_eq!(matcher.matches("SUM", &lexer), hand_parse(&tokens).is_some());
        prop_assert_eq!(lexer.progress(), 0);
    }

    /// The first enumerated match is the longest one.
    #[test]
    fn first_match_is_longest(source in arb_sum_source()) {
        let table = sum_grammar();
        let matcher = GrammarMatcher::new(&table);
        let lexer = Lexer::new(&source);
        let ends = matcher.enumerate_matches("SUM", &lexer);
        if let Some(first) = ends.first() {
            prop_assert!(ends.iter().all(|end| end.progress() <= first.progress()));
        }
    }
}
