// earle-embed - Error type for the embedding API
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use earle_vm::{CompileError, RuntimeError};
use thiserror::Error;

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Type error: expected {expected}, got {found}")]
    Type { expected: &'static str, found: String },

    #[error("'{0}' suspended instead of returning a value")]
    Suspended(String),

    #[error("{pending} script threads still waiting after {ticks} ticks")]
    TickLimit { ticks: usize, pending: usize },
}

impl Error {
    pub fn type_error(expected: &'static str, found: &str) -> Self {
        Error::Type {
            expected,
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
