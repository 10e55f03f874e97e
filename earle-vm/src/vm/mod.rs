// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Virtual machine with resumable call chains.
//!
//! A chain is one logical script thread: a stack of call frames. Running a
//! chain either finishes it or stops at a native that cannot complete yet,
//! in which case the chain is moved into the continuation arena and the
//! host receives a [`Suspension`] to resume it with later.

pub mod continuation;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod scope;
pub mod stack;

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::builtins::register_builtins;
use crate::chunk::EarleFunction;
use crate::events::{EventBus, EventSubscription};
use crate::host::{
    Clock, IdentityLocalizer, Localizer, Printer, StdoutPrinter, SystemClock, normalize_path,
};
use crate::native::{NativeContext, NativeFunction, NativeRegistry, NativeResult, PendingNative};
use crate::opcode::OpCode;
use crate::operators::OperatorTable;
use crate::program::{EarleFile, Program};
use crate::value::{EarleStructure, EarleValue, VariableReference};

pub use continuation::{Continuation, ContinuationArena, ContinuationId, Invocation, Suspension};
pub use error::{Result, RuntimeError};
pub use frame::CallFrame;
pub use handlers::control::ControlFlow;
pub use scope::{ScopeStack, VariablesTable};
pub use stack::ValueStack;

/// VM limits and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Frames allowed on one chain; also bounds nested `thread` starts.
    pub max_call_depth: usize,
    /// Emit a `trace` event for every executed instruction.
    pub trace_instructions: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 256,
            trace_instructions: false,
        }
    }
}

/// A running chain.
pub(crate) struct Chain {
    label: String,
    /// Outermost first.
    frames: Vec<CallFrame>,
    end_on: Vec<EventSubscription>,
}

impl Chain {
    fn new(label: String) -> Self {
        Chain {
            label,
            frames: Vec::new(),
            end_on: Vec::new(),
        }
    }
}

/// A callee after name resolution.
pub(crate) enum Resolved {
    Script(Rc<EarleFunction>),
    Native(NativeFunction),
}

/// What a call did to the chain.
pub(crate) enum CallOutcome {
    /// A script frame was pushed; execution continues inside it.
    Pushed,
    /// A native completed.
    Value(EarleValue),
    /// A native is pending; the chain must suspend.
    Pending {
        name: String,
        pending: Box<dyn PendingNative>,
    },
}

/// The Earle virtual machine.
pub struct VM {
    program: Program,
    natives: NativeRegistry,
    operators: OperatorTable,
    events: EventBus,
    clock: Rc<dyn Clock>,
    localizer: Rc<dyn Localizer>,
    printer: Rc<dyn Printer>,
    /// The `level` global structure.
    level: EarleStructure,
    continuations: ContinuationArena,
    /// Suspended chains started by `thread` calls, awaiting the host.
    spawned: Vec<Suspension>,
    config: VmConfig,
    thread_depth: usize,
}

impl VM {
    /// A VM with the built-in natives and standard operators.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    pub fn with_config(program: Program, config: VmConfig) -> Self {
        let mut natives = NativeRegistry::new();
        register_builtins(&mut natives);
        VM {
            program,
            natives,
            operators: OperatorTable::standard(),
            events: EventBus::new(),
            clock: Rc::new(SystemClock::new()),
            localizer: Rc::new(IdentityLocalizer),
            printer: Rc::new(StdoutPrinter),
            level: EarleStructure::new(),
            continuations: ContinuationArena::new(),
            spawned: Vec::new(),
            config,
            thread_depth: 0,
        }
    }

    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Rc::new(clock);
    }

    pub fn set_localizer(&mut self, localizer: impl Localizer + 'static) {
        self.localizer = Rc::new(localizer);
    }

    pub fn set_printer(&mut self, printer: impl Printer + 'static) {
        self.printer = Rc::new(printer);
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut VmConfig {
        &mut self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }

    pub fn operators_mut(&mut self) -> &mut OperatorTable {
        &mut self.operators
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn level(&self) -> &EarleStructure {
        &self.level
    }

    /// Fire an event. Returns how many waiting subscriptions received it.
    pub fn notify(&self, event: &str, value: EarleValue) -> usize {
        self.events.notify(event, value)
    }

    /// Load (compiling if necessary) the file at `path`.
    pub fn load(&mut self, path: &str) -> Result<Rc<EarleFile>> {
        self.program.load(path).map_err(|error| RuntimeError::Load {
            path: normalize_path(path),
            reason: error.to_string(),
        })
    }

    /// Suspended chains started by `thread` calls since the last call.
    pub fn take_spawned(&mut self) -> Vec<Suspension> {
        std::mem::take(&mut self.spawned)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call `name` in `file` with no `self`.
    pub fn invoke(&mut self, file: &str, name: &str, args: Vec<EarleValue>) -> Result<Invocation> {
        self.invoke_with_target(file, name, args, EarleValue::Undefined)
    }

    /// Call `name` in `file` with `target` as `self`.
    pub fn invoke_with_target(
        &mut self,
        file: &str,
        name: &str,
        args: Vec<EarleValue>,
        target: EarleValue,
    ) -> Result<Invocation> {
        let file = normalize_path(file);
        let callee = VariableReference::new(Some(&file), &name.to_ascii_lowercase());
        debug!(function = %callee, args = args.len(), "invoke");
        self.start_chain(&callee, args, target, &file)
    }

    /// Continue a suspended chain.
    pub fn resume(&mut self, suspension: Suspension) -> Result<Invocation> {
        let (mut chain, name, mut pending) = self.unpack(suspension.root)?;

        if let Some(event) = chain.end_on.iter().find(|s| s.fired()).map(|s| s.name().to_string()) {
            debug!(chain = %chain.label, event = %event, "chain ended");
            return Ok(Invocation::Ended { event });
        }

        let target = chain
            .frames
            .last()
            .map(|frame| frame.target.clone())
            .unwrap_or_default();
        let polled = {
            let mut context = NativeContext::new(
                &target,
                &self.events,
                self.clock.as_ref(),
                self.localizer.as_ref(),
                self.printer.as_ref(),
                &self.level,
                &mut chain.end_on,
            );
            pending.poll(&mut context)?
        };

        match polled {
            None => Ok(Invocation::Incomplete(self.suspend(chain, name, pending))),
            Some(value) => {
                trace!(chain = %chain.label, native = %name, "native completed");
                match chain.frames.last_mut() {
                    Some(frame) => {
                        frame.stack.push(value);
                        self.run_chain(chain)
                    }
                    None => Ok(Invocation::Complete(value)),
                }
            }
        }
    }

    /// Drop a suspended chain without running it. Returns false when the
    /// handle is not pending in this VM.
    pub fn discard(&mut self, suspension: Suspension) -> bool {
        match self.unpack(suspension.root) {
            Ok((chain, _, _)) => {
                debug!(chain = %chain.label, "chain discarded");
                true
            }
            Err(_) => false,
        }
    }

    /// Resolve and call the first function of a new chain.
    fn start_chain(
        &mut self,
        callee: &VariableReference,
        args: Vec<EarleValue>,
        target: EarleValue,
        current_file: &str,
    ) -> Result<Invocation> {
        let mut chain = Chain::new(callee.to_string());
        let resolved = self.resolve(callee, args.len(), current_file)?;
        match self.call_resolved(&mut chain, resolved, args, target)? {
            CallOutcome::Pushed => self.run_chain(chain),
            CallOutcome::Value(value) => Ok(Invocation::Complete(value)),
            CallOutcome::Pending { name, pending } => {
                Ok(Invocation::Incomplete(self.suspend(chain, name, pending)))
            }
        }
    }

    /// Start a `thread` call. It runs until it finishes or suspends; its
    /// failure is logged and goes no further.
    pub(crate) fn spawn_thread(
        &mut self,
        callee: &VariableReference,
        args: Vec<EarleValue>,
        target: EarleValue,
        current_file: &str,
    ) {
        if self.thread_depth >= self.config.max_call_depth {
            warn!(thread = %callee, "thread not started: nested thread limit reached");
            return;
        }
        self.thread_depth += 1;
        let result = self.start_chain(callee, args, target, current_file);
        self.thread_depth -= 1;

        match result {
            Ok(Invocation::Incomplete(suspension)) => {
                debug!(thread = %callee, id = %suspension.id(), "thread suspended");
                self.spawned.push(suspension);
            }
            Ok(_) => trace!(thread = %callee, "thread finished"),
            Err(error) => warn!(thread = %callee, %error, "thread failed"),
        }
    }

    fn run_chain(&mut self, mut chain: Chain) -> Result<Invocation> {
        loop {
            let depth = chain.frames.len();
            let Some(offset) = chain.frames.last().map(|frame| frame.ip) else {
                return Ok(Invocation::Complete(EarleValue::Undefined));
            };
            match self.step(&mut chain) {
                Ok(ControlFlow::Continue) => {}
                Ok(ControlFlow::Return(value)) => return Ok(Invocation::Complete(value)),
                Ok(ControlFlow::Suspend { name, pending }) => {
                    return Ok(Invocation::Incomplete(self.suspend(chain, name, pending)));
                }
                Err(error) => return Err(locate(&chain, depth, offset, error)),
            }
        }
    }

    /// Execute one instruction of the innermost frame.
    fn step(&mut self, chain: &mut Chain) -> Result<ControlFlow> {
        let frame = top(chain)?;
        let offset = frame.ip;
        let op = frame.read_op()?;
        if self.config.trace_instructions {
            trace!(
                function = %frame.function.qualified_name(),
                offset,
                op = %op,
                stack = frame.stack.len(),
                "execute"
            );
        }

        match op {
            OpCode::PushInteger => {
                let value = frame.read_int()?;
                frame.stack.push(EarleValue::Integer(value));
            }
            OpCode::PushFloat => {
                let value = frame.read_float()?;
                frame.stack.push(EarleValue::Float(value));
            }
            OpCode::PushString => {
                let value = frame.read_string()?;
                frame.stack.push(EarleValue::from(value));
            }
            OpCode::PushNull => frame.stack.push(EarleValue::Undefined),
            OpCode::Pop => {
                frame.stack.pop()?;
            }
            OpCode::Duplicate => {
                let value = frame.stack.peek(0)?.clone();
                frame.stack.push(value);
            }
            OpCode::Duplicate2 => {
                let below = frame.stack.peek(1)?.clone();
                let top = frame.stack.peek(0)?.clone();
                frame.stack.push(below);
                frame.stack.push(top);
            }

            OpCode::PushReference
            | OpCode::PushFunction
            | OpCode::PushArray
            | OpCode::PushScope
            | OpCode::PopScope
            | OpCode::Read
            | OpCode::Write
            | OpCode::WriteIndex
            | OpCode::WriteField
            | OpCode::DereferenceIndex
            | OpCode::DereferenceField => self.execute_variables(frame, op)?,

            OpCode::PushVector2 | OpCode::PushVector3 => self.execute_vector(frame, op)?,
            op if op.is_unary_operator() || op.is_binary_operator() => {
                self.execute_arithmetic(frame, op)?
            }

            OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::Return
            | OpCode::Call
            | OpCode::CallOnTarget
            | OpCode::Thread
            | OpCode::ThreadOnTarget => return self.execute_control(chain, op),

            _ => {
                return Err(RuntimeError::InvalidBytecode(format!(
                    "unhandled {} at {}",
                    op, offset
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Find the function `callee` names for `argc` arguments.
    ///
    /// An explicit file is the only place searched. Otherwise the current
    /// file comes first, then its includes in order, then the natives.
    pub(crate) fn resolve(
        &mut self,
        callee: &VariableReference,
        argc: usize,
        current_file: &str,
    ) -> Result<Resolved> {
        let name = &*callee.name;
        if let Some(file) = &callee.file {
            let file = self.load(file)?;
            return match file.function(name, argc) {
                Some(function) => Ok(Resolved::Script(function)),
                None if file.overloads(name).is_empty() => {
                    Err(RuntimeError::UnknownFunction(callee.to_string()))
                }
                None => Err(RuntimeError::NoMatchingOverload {
                    name: callee.to_string(),
                    argc,
                }),
            };
        }

        let current = self.load(current_file)?;
        let mut seen = false;
        let search = std::iter::once(current_file.to_string()).chain(current.includes.iter().cloned());
        for path in search {
            let file = self.load(&path)?;
            if let Some(function) = file.function(name, argc) {
                return Ok(Resolved::Script(function));
            }
            seen |= !file.overloads(name).is_empty();
        }

        if let Some(native) = self.natives.resolve(name, argc) {
            return Ok(Resolved::Native(native.clone()));
        }
        seen |= self.natives.contains(name);
        if seen {
            Err(RuntimeError::NoMatchingOverload {
                name: name.to_string(),
                argc,
            })
        } else {
            Err(RuntimeError::UnknownFunction(name.to_string()))
        }
    }

    pub(crate) fn call_resolved(
        &mut self,
        chain: &mut Chain,
        resolved: Resolved,
        args: Vec<EarleValue>,
        target: EarleValue,
    ) -> Result<CallOutcome> {
        match resolved {
            Resolved::Script(function) => {
                if chain.frames.len() >= self.config.max_call_depth {
                    return Err(RuntimeError::CallDepthExceeded(self.config.max_call_depth));
                }
                chain.frames.push(CallFrame::new(function, args, target));
                Ok(CallOutcome::Pushed)
            }
            Resolved::Native(native) => {
                let mut context = NativeContext::new(
                    &target,
                    &self.events,
                    self.clock.as_ref(),
                    self.localizer.as_ref(),
                    self.printer.as_ref(),
                    &self.level,
                    &mut chain.end_on,
                );
                match native.call(&mut context, &args)? {
                    NativeResult::Complete(value) => Ok(CallOutcome::Value(value)),
                    NativeResult::Pending(pending) => {
                        trace!(native = %native.name, waiting = %pending.describe(), "native pending");
                        Ok(CallOutcome::Pending {
                            name: native.name,
                            pending,
                        })
                    }
                }
            }
        }
    }

    // ========================================================================
    // Suspension
    // ========================================================================

    fn suspend(&mut self, chain: Chain, name: String, pending: Box<dyn PendingNative>) -> Suspension {
        let frames = chain.frames.len();
        let mut next = self.continuations.insert(Continuation::Native {
            name: name.clone(),
            pending,
        });
        for frame in chain.frames.into_iter().rev() {
            next = self.continuations.insert(Continuation::Frame { frame, next });
        }
        let root = self.continuations.insert(Continuation::Chain {
            label: chain.label.clone(),
            end_on: chain.end_on,
            next,
        });
        debug!(chain = %chain.label, frames, native = %name, id = %root, "chain suspended");
        Suspension::new(root, chain.label)
    }

    /// Take a suspended chain out of the arena.
    fn unpack(&mut self, root: ContinuationId) -> Result<(Chain, String, Box<dyn PendingNative>)> {
        let Some(Continuation::Chain {
            label,
            end_on,
            mut next,
        }) = self.continuations.take(root)
        else {
            return Err(RuntimeError::InvalidResumption);
        };
        let mut frames = Vec::new();
        loop {
            match self.continuations.take(next) {
                Some(Continuation::Frame { frame, next: inner }) => {
                    frames.push(frame);
                    next = inner;
                }
                Some(Continuation::Native { name, pending }) => {
                    let chain = Chain {
                        label,
                        frames,
                        end_on,
                    };
                    return Ok((chain, name, pending));
                }
                _ => return Err(RuntimeError::InvalidResumption),
            }
        }
    }
}

impl std::fmt::Debug for VM {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VM")
            .field("program", &self.program)
            .field("continuations", &self.continuations)
            .field("spawned", &self.spawned.len())
            .field("config", &self.config)
            .finish()
    }
}

pub(crate) fn top(chain: &mut Chain) -> Result<&mut CallFrame> {
    chain
        .frames
        .last_mut()
        .ok_or_else(|| RuntimeError::InvalidBytecode("no active frame".to_string()))
}

/// Attach the location of the failing instruction, once.
fn locate(chain: &Chain, depth: usize, offset: usize, error: RuntimeError) -> RuntimeError {
    if matches!(error, RuntimeError::At { .. }) {
        return error;
    }
    match depth.checked_sub(1).and_then(|index| chain.frames.get(index)) {
        Some(frame) => RuntimeError::At {
            location: frame.location(offset),
            source: Box::new(error),
        },
        None => error,
    }
}
