// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Earle bytecode compiler and virtual machine.
//!
//! Source files are compiled into per-function chunks by [`Compiler`] and
//! cached by [`Program`]. The [`VM`] runs calls as chains of frames that can
//! suspend inside a native (`wait`, `waittill`) and be resumed by the host.

pub mod builtins;
pub mod chunk;
pub mod compiler;
pub mod events;
pub mod host;
pub mod native;
pub mod opcode;
pub mod operators;
pub mod program;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, EarleFunction, Instruction, LineInfo, Operand};
pub use compiler::{CompileError, Compiler};
pub use events::{EventBus, EventSubscription};
pub use host::{
    CapturedOutput, Clock, IdentityLocalizer, Localizer, ManualClock, MemorySource, Printer,
    SourceProvider, StdoutPrinter, SystemClock, TableLocalizer, normalize_path,
};
pub use native::{Arity, NativeContext, NativeFunction, NativeRegistry, NativeResult, PendingNative};
pub use opcode::OpCode;
pub use operators::OperatorTable;
pub use program::{EarleFile, LoadError, Program};
pub use value::{EarleArray, EarleStructure, EarleValue, HostObject, ValueKind, VariableReference};
pub use vm::{Invocation, RuntimeError, Suspension, VM, VmConfig};
