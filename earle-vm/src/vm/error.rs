// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.
//!
//! Every error is fatal to the chain that raised it and nothing else.

use thiserror::Error;

/// Runtime error during VM execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("No overload of '{name}' takes {argc} arguments")]
    NoMatchingOverload { name: String, argc: usize },

    #[error("Value is not callable: {0}")]
    NotCallable(String),

    #[error("Call depth exceeded ({0} frames)")]
    CallDepthExceeded(usize),

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("Suspension does not belong to a pending chain of this VM")]
    InvalidResumption,

    #[error("Failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("{name}: {message}")]
    Native { name: String, message: String },

    /// An error raised while executing the instruction at `location`.
    #[error("{location}: {source}")]
    At {
        location: String,
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    pub fn native(name: &str, message: impl Into<String>) -> Self {
        RuntimeError::Native {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// The error without its location wrappers.
    pub fn root_cause(&self) -> &RuntimeError {
        let mut error = self;
        while let RuntimeError::At { source, .. } = error {
            error = source;
        }
        error
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
