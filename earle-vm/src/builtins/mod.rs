// earle-vm - Built-in natives for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Natives every VM starts with.

mod common;
mod flow;

use crate::native::NativeRegistry;

/// Register the built-in natives into `registry`.
pub fn register_builtins(registry: &mut NativeRegistry) {
    flow::register(registry);
    common::register(registry);
}
