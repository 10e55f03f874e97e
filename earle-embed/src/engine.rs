// earle-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding Earle.

use std::path::Path;

use earle_vm::{
    Arity, Clock, EarleValue, Invocation, Localizer, NativeContext, NativeResult, Printer, Program,
    SourceProvider, VM, VmConfig, normalize_path,
};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::convert::{FromEarleValue, IntoEarleValue};
use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, TickReport};
use crate::source::FileSystemSource;

/// The Earle scripting engine: a VM plus the scheduler that resumes its
/// suspended script threads.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** Values share state through `Rc`. Create
/// one engine per OS thread.
///
/// # Example
///
/// ```rust
/// use earle_embed::{EarleValue, Engine};
///
/// let mut engine = Engine::in_memory().unwrap();
/// engine.load_source("main", "add(a, b) { return a + b; }").unwrap();
/// let sum: i32 = engine.call_as("main", "add", vec![2.into(), 3.into()]).unwrap();
/// assert_eq!(sum, 5);
/// ```
pub struct Engine {
    vm: VM,
    scheduler: Scheduler,
}

impl Engine {
    /// An engine loading scripts from `config.script_root`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let source = FileSystemSource::new(&config.script_root, &config.extension);
        Self::with_source(source, config.vm)
    }

    /// An engine that only knows sources given to [`Engine::load_source`].
    pub fn in_memory() -> Result<Self> {
        Self::with_source(earle_vm::MemorySource::new(), VmConfig::default())
    }

    pub fn with_source(source: impl SourceProvider + 'static, config: VmConfig) -> Result<Self> {
        let program = Program::new(source)?;
        Ok(Engine {
            vm: VM::with_config(program, config),
            scheduler: Scheduler::new(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.vm.set_clock(clock);
        self
    }

    pub fn with_localizer(mut self, localizer: impl Localizer + 'static) -> Self {
        self.vm.set_localizer(localizer);
        self
    }

    pub fn with_printer(mut self, printer: impl Printer + 'static) -> Self {
        self.vm.set_printer(printer);
        self
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    /// Compile `source` as the script at logical path `path`.
    pub fn load_source(&mut self, path: &str, source: &str) -> Result<()> {
        self.vm.program_mut().compile_source(path, source)?;
        Ok(())
    }

    /// Load the script at logical path `path` through the source provider.
    pub fn load(&mut self, path: &str) -> Result<()> {
        self.vm.load(path)?;
        Ok(())
    }

    /// Compile a script file from disk. The logical path is the file's path
    /// relative to `root` without extension, or its stem when it lies
    /// elsewhere. Returns the logical path.
    pub fn load_file(&mut self, file: &Path, root: &Path) -> Result<String> {
        let source = std::fs::read_to_string(file).map_err(|source| Error::Io {
            path: file.display().to_string(),
            source,
        })?;
        let logical = logical_path(file, root);
        info!(file = %file.display(), path = %logical, "loading script file");
        self.load_source(&logical, &source)?;
        Ok(logical)
    }

    /// Bytecode listing of every function in the script at `path`.
    pub fn disassemble(&mut self, path: &str) -> Result<String> {
        let file = self.vm.load(path)?;
        let mut listing = String::new();
        for function in file.functions() {
            listing.push_str(&format!(
                "== {}({}) ==\n",
                function.qualified_name(),
                function.parameters.join(", ")
            ));
            listing.push_str(&function.chunk.disassemble());
            listing.push('\n');
        }
        Ok(listing)
    }

    // ========================================================================
    // Natives
    // ========================================================================

    /// Register a host function callable from scripts.
    pub fn register_native<F>(&mut self, name: &str, arity: Arity, handler: F)
    where
        F: Fn(&mut NativeContext<'_>, &[EarleValue]) -> earle_vm::vm::Result<NativeResult> + 'static,
    {
        self.vm.natives_mut().register(name, arity, handler);
    }

    /// Register a host function that always completes immediately.
    ///
    /// ```rust
    /// use earle_embed::{Arity, EarleValue, Engine};
    ///
    /// let mut engine = Engine::in_memory().unwrap();
    /// engine.register_fn("double", Arity::Exact(1), |args| {
    ///     EarleValue::Integer(args[0].as_integer().unwrap_or(0) * 2)
    /// });
    /// engine.load_source("main", "main() { return double(21); }").unwrap();
    /// let result: i32 = engine.call_as("main", "main", Vec::new()).unwrap();
    /// assert_eq!(result, 42);
    /// ```
    pub fn register_fn<F, R>(&mut self, name: &str, arity: Arity, function: F)
    where
        F: Fn(&[EarleValue]) -> R + 'static,
        R: IntoEarleValue,
    {
        self.register_native(name, arity, move |_, args| {
            Ok(NativeResult::Complete(function(args).into_earle_value()))
        });
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call `name` in `path`. A call that suspends becomes a script thread
    /// and yields `None`; its result is discarded once it finishes.
    pub fn call(&mut self, path: &str, name: &str, args: Vec<EarleValue>) -> Result<Option<EarleValue>> {
        self.call_with_target(path, name, args, EarleValue::Undefined)
    }

    pub fn call_with_target(
        &mut self,
        path: &str,
        name: &str,
        args: Vec<EarleValue>,
        target: EarleValue,
    ) -> Result<Option<EarleValue>> {
        let invocation = self.vm.invoke_with_target(path, name, args, target);
        self.scheduler.adopt_spawned(&mut self.vm);
        match invocation? {
            Invocation::Complete(value) => Ok(Some(value)),
            Invocation::Incomplete(suspension) => {
                let id = self.scheduler.spawn(suspension);
                debug!(thread = id, function = name, "call suspended");
                Ok(None)
            }
            Invocation::Ended { .. } => Ok(None),
        }
    }

    /// Call `name` and convert its result. Fails if the call suspends.
    pub fn call_as<T: FromEarleValue>(&mut self, path: &str, name: &str, args: Vec<EarleValue>) -> Result<T> {
        match self.call(path, name, args)? {
            Some(value) => T::from_earle_value(&value),
            None => Err(Error::Suspended(format!("{}::{}", normalize_path(path), name))),
        }
    }

    /// Fire a script event.
    pub fn notify(&mut self, event: &str, value: EarleValue) -> usize {
        self.vm.notify(event, value)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Resume every waiting script thread once.
    pub fn tick(&mut self) -> TickReport {
        self.scheduler.tick(&mut self.vm)
    }

    /// Tick until no thread waits. Returns the number of ticks run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> Result<usize> {
        let mut ticks = 0;
        while !self.scheduler.is_empty() {
            if ticks == max_ticks {
                return Err(Error::TickLimit {
                    ticks,
                    pending: self.scheduler.len(),
                });
            }
            self.tick();
            ticks += 1;
        }
        Ok(ticks)
    }

    pub fn pending_threads(&self) -> usize {
        self.scheduler.len()
    }

    /// Abandon every waiting script thread.
    pub fn stop_all(&mut self) {
        self.scheduler.clear(&mut self.vm);
    }

    pub fn level(&self) -> &earle_vm::EarleStructure {
        self.vm.level()
    }

    pub fn vm(&self) -> &VM {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut VM {
        &mut self.vm
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("vm", &self.vm)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

fn logical_path(file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).ok().filter(|p| p.components().count() > 0);
    let relative = relative.unwrap_or_else(|| Path::new(file.file_name().unwrap_or_default()));
    let segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    normalize_path(&segments.join("\\"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_path() {
        let root = Path::new("scripts");
        assert_eq!(
            logical_path(&Path::new("scripts").join("maps").join("util.gsc"), root),
            "maps\\util"
        );
        assert_eq!(logical_path(Path::new("elsewhere/Main.gsc"), root), "main");
    }
}
