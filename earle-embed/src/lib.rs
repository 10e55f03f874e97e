// earle-embed - Embedding API for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # earle-embed
//!
//! A high-level embedding API for the Earle scripting language.
//!
//! [`Engine`] owns a VM and a cooperative [`Scheduler`]. Calls that suspend
//! (`wait`, `waittill`) become script threads which the host advances with
//! [`Engine::tick`], typically once per frame.
//!
//! ## Quick Start
//!
//! ```rust
//! use earle_embed::Engine;
//!
//! let mut engine = Engine::in_memory().unwrap();
//! engine
//!     .load_source("main", "main() { v = waittill(\"go\"); level.v = v; }")
//!     .unwrap();
//! assert!(engine.call("main", "main", Vec::new()).unwrap().is_none());
//! engine.notify("go", 5.into());
//! engine.tick();
//! assert_eq!(engine.pending_threads(), 0);
//! assert_eq!(engine.level().get("v"), Some(5.into()));
//! ```

mod config;
mod convert;
mod engine;
mod error;
mod scheduler;
mod source;

pub use config::EngineConfig;
pub use convert::{FromEarleValue, IntoEarleValue, from_earle, to_earle};
pub use engine::Engine;
pub use error::{Error, Result};
pub use scheduler::{Scheduler, ScriptThread, ThreadFailure, TickReport};
pub use source::FileSystemSource;

// Re-export core types for convenience
pub use earle_vm::{
    Arity, EarleArray, EarleStructure, EarleValue, Invocation, ManualClock, NativeContext,
    NativeResult, PendingNative, RuntimeError, VmConfig,
};
