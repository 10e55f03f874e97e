// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The compiler's view of the source: a token walker plus grammar lookahead.

use earle_parser::{
    GrammarMatcher, GrammarRuleTable, Lexer, ParseError, Position, Token, TokenKind, TokenWalker,
};
use tracing::trace;

use crate::chunk::LineInfo;

pub(crate) struct TokenStream<'g> {
    walker: TokenWalker,
    matcher: GrammarMatcher<'g>,
    /// Position of the last consumed token, for errors at end of input.
    last_position: Position,
}

impl<'g> TokenStream<'g> {
    pub fn new(grammar: &'g GrammarRuleTable, lexer: Lexer) -> Self {
        TokenStream {
            walker: TokenWalker::new(lexer),
            matcher: GrammarMatcher::new(grammar),
            last_position: Position::default(),
        }
    }

    pub fn current(&self) -> Option<Token> {
        self.walker.current()
    }

    pub fn peek_next(&self) -> Option<Token> {
        self.walker.lexer().peek_next()
    }

    pub fn is_at_end(&self) -> bool {
        self.walker.with_current(|token| token.is_none())
    }

    pub fn position(&self) -> Position {
        self.walker
            .with_current(|token| token.map(|t| t.position.clone()))
            .unwrap_or_else(|| self.last_position.clone())
    }

    /// Location of the most recently consumed token.
    pub fn line_info(&self) -> LineInfo {
        let position = &self.last_position;
        LineInfo::new(position.line as u32, position.column as u32)
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Option<Token> {
        let token = self.walker.current()?;
        self.last_position = token.position.clone();
        self.walker.advance();
        Some(token)
    }

    pub fn push_back(&mut self, token: Token) {
        self.walker.push(token);
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.walker
            .with_current(|token| token.is_some_and(|t| t.is_symbol(symbol)))
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.walker
            .with_current(|token| token.is_some_and(|t| t.is_keyword(keyword)))
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.walker
            .with_current(|token| token.is_some_and(|t| t.kind == kind))
    }

    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        let found = self.is_symbol(symbol);
        if found {
            self.advance();
        }
        found
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.is_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    /// Consume `symbols` as one unit, or nothing at all.
    pub fn eat_symbols(&mut self, symbols: &[&str]) -> bool {
        let last_position = self.last_position.clone();
        self.walker.begin();
        for symbol in symbols {
            if !self.is_symbol(symbol) {
                self.walker.drop_session();
                self.last_position = last_position;
                return false;
            }
            self.advance();
        }
        self.walker.flush();
        true
    }

    pub fn expect_symbol(&mut self, symbol: &str) -> Result<Token, ParseError> {
        if self.is_symbol(symbol) {
            self.advance().ok_or_else(|| self.expected(&format!("'{}'", symbol)))
        } else {
            Err(self.expected(&format!("'{}'", symbol)))
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<Token, ParseError> {
        if self.is_keyword(keyword) {
            self.advance().ok_or_else(|| self.expected(&format!("'{}'", keyword)))
        } else {
            Err(self.expected(&format!("'{}'", keyword)))
        }
    }

    pub fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.is_kind(kind) {
            self.advance().ok_or_else(|| self.expected(what))
        } else {
            Err(self.expected(what))
        }
    }

    /// Identifiers are case-insensitive; names are kept lowercase.
    pub fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.expect_kind(TokenKind::Identifier, "identifier")?;
        Ok(token.value.to_ascii_lowercase())
    }

    /// Does `rule` match at the cursor? Nothing is consumed.
    pub fn matches(&self, rule: &str) -> bool {
        let found = self.matcher.matches(rule, self.walker.lexer());
        trace!(rule, found, "grammar lookahead");
        found
    }

    /// The first statement rule, in declaration order, matching at the cursor.
    pub fn statement_kind(&self) -> Option<&'g str> {
        let table = self.matcher.table();
        table.statement_rules().find(|rule| self.matches(rule))
    }

    pub fn expected(&self, what: &str) -> ParseError {
        self.walker
            .with_current(|token| ParseError::expected(what, token, &self.last_position))
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.position())
    }

    pub fn session_depth(&self) -> usize {
        self.walker.depth()
    }
}

#[cfg(test)]
mod tests {
    use earle_parser::{earle_grammar, Lexer};

    use super::TokenStream;

    #[test]
    fn test_failed_eat_symbols_rewinds_position() {
        let grammar = earle_grammar().unwrap();
        let mut tokens = TokenStream::new(&grammar, Lexer::new("x\n+ y"));
        tokens.advance();
        let before = tokens.line_info();

        assert!(!tokens.eat_symbols(&["+", "+"]));
        assert_eq!(tokens.line_info(), before);
        assert!(tokens.is_symbol("+"));
        assert_eq!(tokens.session_depth(), 0);

        assert!(tokens.eat_symbols(&["+"]));
        assert_ne!(tokens.line_info(), before);
    }
}
