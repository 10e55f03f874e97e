// earle-embed - Engine configuration
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::path::PathBuf;

use earle_vm::VmConfig;

/// Settings for an [`Engine`](crate::Engine) backed by script files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub vm: VmConfig,
    /// Directory logical script paths are resolved against.
    pub script_root: PathBuf,
    /// Script file extension, without the dot.
    pub extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            vm: VmConfig::default(),
            script_root: PathBuf::from("."),
            extension: "gsc".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_script_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.script_root = root.into();
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.vm.max_call_depth = depth;
        self
    }

    pub fn with_trace_instructions(mut self, trace: bool) -> Self {
        self.vm.trace_instructions = trace;
        self
    }
}
