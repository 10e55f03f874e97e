// earle-vm - Compiled files and the program loader
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiled script files and the loader that compiles them on demand.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use earle_parser::{GrammarRuleTable, earle_grammar};
use thiserror::Error;
use tracing::debug;

use crate::chunk::EarleFunction;
use crate::compiler::{CompileError, Compiler};
use crate::host::{SourceProvider, normalize_path};

/// A compiled source file: its includes and its functions, grouped by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarleFile {
    pub name: Rc<str>,
    /// Logical paths named by `#include`, in source order.
    pub includes: Vec<String>,
    functions: HashMap<String, Vec<Rc<EarleFunction>>>,
}

impl EarleFile {
    pub fn new(name: &str) -> Self {
        EarleFile {
            name: Rc::from(name),
            includes: Vec::new(),
            functions: HashMap::new(),
        }
    }

    /// Add a function. Overloads must differ in parameter count.
    pub fn add_function(&mut self, function: EarleFunction) -> Result<(), CompileError> {
        let arity = function.arity();
        let overloads = self.functions.entry(function.name.clone()).or_default();
        if overloads.iter().any(|f| f.arity() == arity) {
            return Err(CompileError::DuplicateFunction {
                file: self.name.to_string(),
                name: function.name,
                arity,
            });
        }
        overloads.push(Rc::new(function));
        Ok(())
    }

    /// Every overload declared under `name`.
    pub fn overloads(&self, name: &str) -> &[Rc<EarleFunction>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn function(&self, name: &str, arity: usize) -> Option<Rc<EarleFunction>> {
        self.overloads(name)
            .iter()
            .find(|f| f.arity() == arity)
            .cloned()
    }

    /// All functions, ordered by name then arity.
    pub fn functions(&self) -> Vec<Rc<EarleFunction>> {
        let mut all: Vec<Rc<EarleFunction>> = self.functions.values().flatten().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.arity().cmp(&b.arity())));
        all
    }

    pub fn function_count(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }
}

/// Failure to bring a file into the program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("script '{0}' not found")]
    NotFound(String),

    #[error("failed to compile '{path}': {source}")]
    Compile { path: String, source: CompileError },
}

/// Every file compiled so far, plus the means to compile more.
pub struct Program {
    grammar: Rc<GrammarRuleTable>,
    source: Box<dyn SourceProvider>,
    files: HashMap<String, Rc<EarleFile>>,
}

impl Program {
    /// A program using the Earle grammar.
    pub fn new(source: impl SourceProvider + 'static) -> Result<Self, CompileError> {
        Ok(Self::with_grammar(Rc::new(earle_grammar()?), source))
    }

    pub fn with_grammar(grammar: Rc<GrammarRuleTable>, source: impl SourceProvider + 'static) -> Self {
        Program {
            grammar,
            source: Box::new(source),
            files: HashMap::new(),
        }
    }

    pub fn grammar(&self) -> &Rc<GrammarRuleTable> {
        &self.grammar
    }

    /// Compile `source` as `path`, replacing any earlier version of the file.
    pub fn compile_source(&mut self, path: &str, source: &str) -> Result<Rc<EarleFile>, CompileError> {
        let key = normalize_path(path);
        let file = Rc::new(Compiler::new(&self.grammar, &key, source).compile()?);
        self.files.insert(key, Rc::clone(&file));
        Ok(file)
    }

    /// The compiled file at `path`, compiling it through the source provider
    /// the first time it is asked for.
    pub fn load(&mut self, path: &str) -> Result<Rc<EarleFile>, LoadError> {
        let key = normalize_path(path);
        if let Some(file) = self.files.get(&key) {
            return Ok(Rc::clone(file));
        }
        debug!(file = %key, "loading script");
        let source = self
            .source
            .load(&key)
            .ok_or_else(|| LoadError::NotFound(key.clone()))?;
        self.compile_source(&key, &source)
            .map_err(|source| LoadError::Compile { path: key, source })
    }

    /// An already loaded file.
    pub fn get(&self, path: &str) -> Option<Rc<EarleFile>> {
        self.files.get(&normalize_path(path)).cloned()
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.files.keys().collect();
        names.sort();
        f.debug_struct("Program").field("files", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemorySource;

    #[test]
    fn test_load_compiles_once() {
        let source = MemorySource::new().with_file("maps\\util", "f() { return 1; }");
        let mut program = Program::new(source).unwrap();
        assert!(!program.is_loaded("maps/util"));
        let first = program.load("maps/util").unwrap();
        let second = program.load("MAPS\\UTIL").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.function_count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let mut program = Program::new(MemorySource::new()).unwrap();
        assert_eq!(program.load("nope").unwrap_err(), LoadError::NotFound("nope".to_string()));
    }

    #[test]
    fn test_load_reports_compile_errors() {
        let source = MemorySource::new().with_file("bad", "f( { }");
        let mut program = Program::new(source).unwrap();
        assert!(matches!(program.load("bad"), Err(LoadError::Compile { .. })));
    }

    #[test]
    fn test_duplicate_overload_rejected() {
        let mut program = Program::new(MemorySource::new()).unwrap();
        let result = program.compile_source("dup", "f(a) {} f(b) {} f() {}");
        assert!(matches!(
            result,
            Err(CompileError::DuplicateFunction { ref name, arity: 1, .. }) if name == "f"
        ));
    }
}
