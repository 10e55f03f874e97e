// earle-parser - Token walker for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Speculative consumption over a [`Lexer`].
//!
//! A session marks a point the walker can return to. `flush` keeps what was
//! consumed since the matching `begin`, `drop_session` rewinds to it.
//! Sessions nest with stack discipline.

use crate::lexer::{Checkpoint, Lexer, Token};

#[derive(Debug, Clone)]
pub struct TokenWalker {
    lexer: Lexer,
    sessions: Vec<Checkpoint>,
}

impl TokenWalker {
    pub fn new(lexer: Lexer) -> Self {
        TokenWalker {
            lexer,
            sessions: Vec::new(),
        }
    }

    pub fn begin(&mut self) {
        self.sessions.push(self.lexer.checkpoint());
    }

    /// Close the innermost session, keeping its consumption.
    pub fn flush(&mut self) {
        let closed = self.sessions.pop();
        debug_assert!(closed.is_some(), "flush without an open session");
    }

    /// Close the innermost session, rewinding the cursor to where it began.
    pub fn drop_session(&mut self) {
        match self.sessions.pop() {
            Some(checkpoint) => self.lexer.restore(checkpoint),
            None => debug_assert!(false, "drop without an open session"),
        }
    }

    /// Number of open sessions.
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    pub fn current(&self) -> Option<Token> {
        self.lexer.current()
    }

    pub fn with_current<R>(&self, f: impl FnOnce(Option<&Token>) -> R) -> R {
        self.lexer.with_current(f)
    }

    pub fn advance(&mut self) -> bool {
        self.lexer.advance()
    }

    pub fn push(&mut self, token: Token) {
        self.lexer.push(token);
    }

    pub fn progress(&self) -> usize {
        self.lexer.progress()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.lexer.checkpoint()
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.lexer.restore(checkpoint);
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn into_lexer(self) -> Lexer {
        self.lexer
    }
}
