// earle-vm - Host interfaces for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! What the VM needs from its host: script sources, localized strings,
//! somewhere to print and a clock.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Normalize a logical script path: lowercase, backslash separated, no
/// extension.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('/', "\\").to_ascii_lowercase();
    match path.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('\\') && !stem.is_empty() => stem.to_string(),
        _ => path,
    }
}

/// Supplies script source text by logical path (`maps\mp\utility`).
pub trait SourceProvider {
    fn load(&self, path: &str) -> Option<String>;
}

/// In-memory sources keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: &str, source: &str) {
        self.files.insert(normalize_path(path), source.to_string());
    }
}

impl SourceProvider for MemorySource {
    fn load(&self, path: &str) -> Option<String> {
        self.files.get(&normalize_path(path)).cloned()
    }
}

/// Resolves `&"KEY"` strings.
pub trait Localizer {
    fn localize(&self, key: &str) -> String;
}

/// Returns every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLocalizer;

impl Localizer for IdentityLocalizer {
    fn localize(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Lookup table with the key itself as fallback.
#[derive(Debug, Clone, Default)]
pub struct TableLocalizer {
    strings: HashMap<String, String>,
}

impl TableLocalizer {
    pub fn new(strings: HashMap<String, String>) -> Self {
        TableLocalizer { strings }
    }
}

impl Localizer for TableLocalizer {
    fn localize(&self, key: &str) -> String {
        self.strings.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

/// Destination of `print` and `println`.
pub trait Printer {
    fn print(&self, text: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(&self, text: &str) {
        use std::io::Write;
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Collects printed text. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Rc<RefCell<String>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl Printer for CapturedOutput {
    fn print(&self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

/// Time source for timed waits.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("Maps/MP/Utility.gsc"), "maps\\mp\\utility");
        assert_eq!(normalize_path("maps\\mp\\utility"), "maps\\mp\\utility");
        assert_eq!(normalize_path("main"), "main");
    }

    #[test]
    fn test_memory_source_lookup_is_normalized() {
        let source = MemorySource::new().with_file("a/B", "x");
        assert_eq!(source.load("a\\b"), Some("x".to_string()));
        assert_eq!(source.load("a\\c"), None);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(view.now(), Duration::from_millis(250));
    }
}
