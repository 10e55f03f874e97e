// earle-parser - The Earle language grammar
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Rule table for the Earle language.
//!
//! Statement rules only need to identify the construct at the cursor; the
//! code generator consumes the statement itself. Expression rules describe
//! complete shapes, since the code generator relies on them to tell calls,
//! variables, vectors and parenthesised expressions apart.

use crate::error::GrammarError;
use crate::grammar::table::GrammarRuleTable;

/// Statement rules in dispatch order.
const STATEMENTS: &[(&str, &str)] = &[
    ("STATEMENT_BLOCK", "{"),
    ("STATEMENT_IF", "`if` ("),
    ("STATEMENT_WHILE", "`while` ("),
    ("STATEMENT_DO", "`do`"),
    ("STATEMENT_FOR", "`for` ("),
    ("STATEMENT_RETURN", "`return`"),
    ("STATEMENT_BREAK", "`break` ;"),
    ("STATEMENT_CONTINUE", "`continue` ;"),
    ("STATEMENT_WAIT", "`wait` EXPRESSION ;"),
    ("STATEMENT_EMPTY", ";"),
    ("STATEMENT_ASSIGNMENT", "ASSIGNMENT ;"),
    ("STATEMENT_CALL", "FUNCTION_CALL ;"),
    ("STATEMENT_EXPRESSION", "EXPRESSION ;"),
];

const RULES: &[(&str, &str)] = &[
    // Top level
    ("INCLUDE", "# `include` PATH ;"),
    ("FUNCTION_DECLARATION", "IDENTIFIER ( OPTIONAL PARAMETER_LIST ) {"),
    ("PARAMETER_LIST", "IDENTIFIER"),
    ("PARAMETER_LIST", "PARAMETER_LIST , IDENTIFIER"),
    // Names
    ("PATH", "IDENTIFIER"),
    ("PATH", "PATH \\ IDENTIFIER"),
    ("FUNCTION_REFERENCE", "\"::\" IDENTIFIER"),
    ("FUNCTION_REFERENCE", "PATH \"::\" IDENTIFIER"),
    ("FUNCTION_NAME", "FUNCTION_REFERENCE"),
    ("FUNCTION_NAME", "IDENTIFIER"),
    ("FUNCTION_NAME", "\"[[\" EXPRESSION \"]]\""),
    // Calls
    ("CALL_ARGUMENTS", "EXPRESSION"),
    ("CALL_ARGUMENTS", "CALL_ARGUMENTS , EXPRESSION"),
    ("PLAIN_CALL", "OPTIONAL `thread` FUNCTION_NAME ( OPTIONAL CALL_ARGUMENTS )"),
    ("FUNCTION_CALL", "PLAIN_CALL"),
    ("FUNCTION_CALL", "VARIABLE PLAIN_CALL"),
    // Variables
    ("VARIABLE", "IDENTIFIER"),
    ("VARIABLE", "VARIABLE . IDENTIFIER"),
    ("VARIABLE", "VARIABLE [ EXPRESSION ]"),
    // Assignment
    ("ASSIGNMENT", "VARIABLE ASSIGNMENT_OPERATOR EXPRESSION"),
    ("ASSIGNMENT", "VARIABLE \"++\""),
    ("ASSIGNMENT", "VARIABLE \"--\""),
    ("ASSIGNMENT_OPERATOR", "="),
    ("ASSIGNMENT_OPERATOR", "\"+=\""),
    ("ASSIGNMENT_OPERATOR", "\"-=\""),
    ("ASSIGNMENT_OPERATOR", "\"*=\""),
    ("ASSIGNMENT_OPERATOR", "\"/=\""),
    ("ASSIGNMENT_OPERATOR", "\"%=\""),
    ("ASSIGNMENT_OPERATOR", "\"&=\""),
    ("ASSIGNMENT_OPERATOR", "\"|=\""),
    ("ASSIGNMENT_OPERATOR", "\"^=\""),
    // Operands
    // `(a)`, `(a, b)` and `(a, b, c)` share their prefix so each component
    // is matched once.
    ("PARENTHESISED", "( EXPRESSION PARENTHESISED_TAIL"),
    ("PARENTHESISED_TAIL", ")"),
    ("PARENTHESISED_TAIL", ", EXPRESSION VECTOR_TAIL"),
    ("VECTOR_TAIL", ")"),
    ("VECTOR_TAIL", ", EXPRESSION )"),
    ("OPERAND", "NUMBER_LITERAL | STRING_LITERAL"),
    ("OPERAND", "& STRING_LITERAL"),
    ("OPERAND", "[ ]"),
    ("OPERAND", "PARENTHESISED"),
    ("OPERAND", "FUNCTION_CALL"),
    ("OPERAND", "FUNCTION_REFERENCE"),
    ("OPERAND", "VARIABLE"),
    ("OPERAND", "UNARY_OPERATOR OPERAND"),
    ("OPERAND", "OPERAND . IDENTIFIER"),
    ("OPERAND", "OPERAND [ EXPRESSION ]"),
    ("UNARY_OPERATOR", "!"),
    ("UNARY_OPERATOR", "-"),
    ("UNARY_OPERATOR", "~"),
    // Expressions
    ("EXPRESSION", "OPERAND"),
    ("EXPRESSION", "EXPRESSION BINARY_OPERATOR OPERAND"),
    ("BINARY_OPERATOR", "\"||\""),
    ("BINARY_OPERATOR", "\"&&\""),
    ("BINARY_OPERATOR", "\"==\""),
    ("BINARY_OPERATOR", "\"!=\""),
    ("BINARY_OPERATOR", "\"<=\""),
    ("BINARY_OPERATOR", "\">=\""),
    ("BINARY_OPERATOR", "\"<<\""),
    ("BINARY_OPERATOR", "\">>\""),
    ("BINARY_OPERATOR", "\"|\""),
    ("BINARY_OPERATOR", "^"),
    ("BINARY_OPERATOR", "&"),
    ("BINARY_OPERATOR", "<"),
    ("BINARY_OPERATOR", ">"),
    ("BINARY_OPERATOR", "+"),
    ("BINARY_OPERATOR", "-"),
    ("BINARY_OPERATOR", "*"),
    ("BINARY_OPERATOR", "/"),
    ("BINARY_OPERATOR", "%"),
];

/// Build the rule table for the Earle language.
pub fn earle_grammar() -> Result<GrammarRuleTable, GrammarError> {
    let mut table = GrammarRuleTable::new();
    for (name, text) in STATEMENTS {
        table.add_rule(name, true, text)?;
    }
    for (name, text) in RULES {
        table.add_rule(name, false, text)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::matcher::GrammarMatcher;
    use crate::lexer::Lexer;

    fn statement_kind(table: &GrammarRuleTable, source: &str) -> Option<String> {
        let matcher = GrammarMatcher::new(table);
        let lexer = Lexer::new(source);
        table
            .statement_rules()
            .find(|rule| matcher.matches(rule, &lexer))
            .map(str::to_string)
    }

    #[test]
    fn test_grammar_compiles() {
        let table = earle_grammar().unwrap();
        assert_eq!(table.statement_rules().count(), STATEMENTS.len());
    }

    #[test]
    fn test_statement_dispatch() {
        let table = earle_grammar().unwrap();
        let cases = [
            ("{ a = 1; }", "STATEMENT_BLOCK"),
            ("if (a) b();", "STATEMENT_IF"),
            ("while (i < 3) i++;", "STATEMENT_WHILE"),
            ("return a + 1;", "STATEMENT_RETURN"),
            ("wait 0.5;", "STATEMENT_WAIT"),
            ("a = b == c;", "STATEMENT_ASSIGNMENT"),
            ("a.b[2] += 3;", "STATEMENT_ASSIGNMENT"),
            ("i++;", "STATEMENT_ASSIGNMENT"),
            ("foo(1, 2);", "STATEMENT_CALL"),
            ("self thread foo();", "STATEMENT_CALL"),
            ("maps\\mp\\utility::foo();", "STATEMENT_CALL"),
            ("[[ f ]](1);", "STATEMENT_CALL"),
            ("a == b;", "STATEMENT_EXPRESSION"),
            ("a - -1;", "STATEMENT_EXPRESSION"),
            (";", "STATEMENT_EMPTY"),
        ];
        for (source, expected) in cases {
            assert_eq!(
                statement_kind(&table, source).as_deref(),
                Some(expected),
                "statement {:?}",
                source
            );
        }
    }

    #[test]
    fn test_incomplete_statement_matches_nothing() {
        let table = earle_grammar().unwrap();
        assert_eq!(statement_kind(&table, "foo()"), None);
        assert_eq!(statement_kind(&table, "a = ;"), None);
    }

    #[test]
    fn test_vector_and_parenthesis_shapes() {
        let table = earle_grammar().unwrap();
        let matcher = GrammarMatcher::new(&table);
        let length = |source: &str| matcher.match_length("PARENTHESISED", &Lexer::new(source));
        assert_eq!(length("(1, 2, 3)"), Some(7));
        assert_eq!(length("(1, 2)"), Some(5));
        assert_eq!(length("(1 + 2)"), Some(5));
        assert_eq!(length("(1, 2, 3, 4)"), None);
        assert_eq!(length("(1, 2"), None);
    }

    #[test]
    fn test_binary_operators_include_bitwise_or() {
        let table = earle_grammar().unwrap();
        let matcher = GrammarMatcher::new(&table);
        assert_eq!(matcher.match_length("EXPRESSION", &Lexer::new("a | b ;")), Some(3));
        assert_eq!(matcher.match_length("EXPRESSION", &Lexer::new("a || b ;")), Some(4));
    }

    #[test]
    fn test_deeply_nested_parentheses_match_quickly() {
        let table = earle_grammar().unwrap();
        let matcher = GrammarMatcher::new(&table);
        let depth = 24;
        let source = format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        let started = std::time::Instant::now();
        assert!(matcher.matches("STATEMENT_ASSIGNMENT", &Lexer::new(&source)));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
