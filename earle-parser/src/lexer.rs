// earle-parser - Lexer for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Earle source code.
//!
//! Tokens are scanned lazily into an arena shared by every clone of a
//! [`Lexer`]. A lexer is therefore a cheap cursor: cloning it, saving a
//! [`Checkpoint`] and restoring it later never re-scans the source.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The four token classes the grammar can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// Any single character that does not start another token.
    Token,
    NumberLiteral,
    StringLiteral,
}

impl TokenKind {
    /// Look up a token class by the name used in grammar rule text.
    pub fn from_type_name(name: &str) -> Option<TokenKind> {
        const NAMES: [(&str, TokenKind); 4] = [
            ("IDENTIFIER", TokenKind::Identifier),
            ("TOKEN", TokenKind::Token),
            ("NUMBER_LITERAL", TokenKind::NumberLiteral),
            ("STRING_LITERAL", TokenKind::StringLiteral),
        ];
        NAMES
            .iter()
            .find(|(type_name, _)| type_name.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Token => "TOKEN",
            TokenKind::NumberLiteral => "NUMBER_LITERAL",
            TokenKind::StringLiteral => "STRING_LITERAL",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Source location of a token (1-indexed line and column).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Position {
    pub file: Option<Rc<str>>,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text. String literals hold their unescaped contents.
    pub value: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: Position) -> Self {
        Token {
            kind,
            value: value.into(),
            position,
        }
    }

    /// True for the generic single-character token `symbol`.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Token && self.value == symbol
    }

    /// True for an identifier spelled `keyword` (identifiers are case-insensitive).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.value.eq_ignore_ascii_case(keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::StringLiteral => write!(f, "\"{}\"", self.value.escape_default()),
            _ => f.write_str(&self.value),
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    file: Option<Rc<str>>,
}

impl Scanner {
    fn new(file: Option<Rc<str>>, source: &str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    while self.peek().is_some() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let position = self.position();
        let c = self.peek()?;

        let (kind, value) = if c.is_ascii_alphabetic() || c == '_' {
            (TokenKind::Identifier, self.read_identifier())
        } else if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit()))
        {
            (TokenKind::NumberLiteral, self.read_number())
        } else if c == '"' {
            (TokenKind::StringLiteral, self.read_string())
        } else {
            self.bump();
            (TokenKind::Token, c.to_string())
        };

        Some(Token::new(kind, value, position))
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    // [0-9]*\.?[0-9]+
    fn read_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                text.push(c);
                self.bump();
            }
        }
        text
    }

    fn read_string(&mut self) -> String {
        self.bump(); // opening quote
        let mut text = String::new();
        while let Some(c) = self.bump() {
            match c {
                '"' => break,
                '\\' => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('0') => text.push('\0'),
                    Some(other) => text.push(other),
                    None => break,
                },
                _ => text.push(c),
            }
        }
        text
    }
}

// ============================================================================
// Token arena
// ============================================================================

struct TokenArena {
    scanner: Scanner,
    tokens: Vec<Token>,
    exhausted: bool,
}

impl TokenArena {
    /// Scan forward until `index` is available or the source runs out.
    fn fill_to(&mut self, index: usize) -> bool {
        while self.tokens.len() <= index && !self.exhausted {
            match self.scanner.next_token() {
                Some(token) => self.tokens.push(token),
                None => self.exhausted = true,
            }
        }
        index < self.tokens.len()
    }
}

/// Saved cursor state of a [`Lexer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    index: usize,
    pushed: Vec<Token>,
}

/// A cursor over the lazily scanned token stream of one source text.
///
/// The lexer never fails: every character either starts a token or is
/// skipped as whitespace or comment.
#[derive(Clone)]
pub struct Lexer {
    arena: Rc<RefCell<TokenArena>>,
    index: usize,
    /// Tokens replayed before the arena, last element first.
    pushed: Vec<Token>,
}

impl Lexer {
    /// Create a lexer for source text without a file name.
    pub fn new(source: &str) -> Self {
        Self::build(None, source)
    }

    /// Create a lexer whose token positions carry `file`.
    pub fn with_file(file: &str, source: &str) -> Self {
        Self::build(Some(Rc::from(file)), source)
    }

    fn build(file: Option<Rc<str>>, source: &str) -> Self {
        Lexer {
            arena: Rc::new(RefCell::new(TokenArena {
                scanner: Scanner::new(file, source),
                tokens: Vec::new(),
                exhausted: false,
            })),
            index: 0,
            pushed: Vec::new(),
        }
    }

    /// Tokenize a whole source text.
    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.current() {
            tokens.push(token);
            lexer.advance();
        }
        tokens
    }

    /// The token at the cursor, or `None` at end of input.
    pub fn current(&self) -> Option<Token> {
        self.with_current(|token| token.cloned())
    }

    /// Inspect the current token without cloning it.
    pub fn with_current<R>(&self, f: impl FnOnce(Option<&Token>) -> R) -> R {
        if let Some(token) = self.pushed.last() {
            return f(Some(token));
        }
        let mut arena = self.arena.borrow_mut();
        if arena.fill_to(self.index) {
            f(arena.tokens.get(self.index))
        } else {
            f(None)
        }
    }

    /// Move past the current token. Returns whether a token is now available.
    pub fn advance(&mut self) -> bool {
        if self.pushed.pop().is_none() && self.arena.borrow_mut().fill_to(self.index) {
            self.index += 1;
        }
        !self.is_at_end()
    }

    /// Replay `token` before anything else this cursor would yield.
    pub fn push(&mut self, token: Token) {
        self.pushed.push(token);
    }

    pub fn is_at_end(&self) -> bool {
        self.with_current(|token| token.is_none())
    }

    /// Number of tokens consumed so far. Pushed-back tokens count as unconsumed.
    pub fn progress(&self) -> usize {
        self.index.saturating_sub(self.pushed.len())
    }

    /// Arena index and pushed-token count. Identifies a cursor among the
    /// positions reachable from one starting lexer by `advance` alone.
    pub(crate) fn cursor(&self) -> (usize, usize) {
        (self.index, self.pushed.len())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            index: self.index,
            pushed: self.pushed.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.index = checkpoint.index;
        self.pushed = checkpoint.pushed;
    }

    /// The token after the current one.
    pub fn peek_next(&self) -> Option<Token> {
        let mut lookahead = self.clone();
        lookahead.advance();
        lookahead.current()
    }
}

impl fmt::Debug for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer")
            .field("index", &self.index)
            .field("pushed", &self.pushed.len())
            .field("current", &self.current())
            .finish()
    }
}
