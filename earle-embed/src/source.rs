// earle-embed - Script sources on disk
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::path::{Path, PathBuf};

use earle_vm::{SourceProvider, normalize_path};
use tracing::{debug, warn};

/// Loads `a\b\c` from `<root>/a/b/c.<extension>`.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
    extension: String,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        FileSystemSource {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a logical path maps to.
    pub fn path_for(&self, logical: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in normalize_path(logical).split('\\').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.set_extension(&self.extension);
        path
    }
}

impl SourceProvider for FileSystemSource {
    fn load(&self, path: &str) -> Option<String> {
        let file = self.path_for(path);
        match std::fs::read_to_string(&file) {
            Ok(text) => {
                debug!(path, file = %file.display(), bytes = text.len(), "read script");
                Some(text)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path, file = %file.display(), "script not found");
                None
            }
            Err(error) => {
                warn!(path, file = %file.display(), %error, "failed to read script");
                None
            }
        }
    }
}
