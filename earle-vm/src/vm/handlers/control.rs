// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jumps, calls, threads and returns.

use std::fmt;

use crate::native::PendingNative;
use crate::opcode::OpCode;
use crate::value::{EarleValue, VariableReference};
use crate::vm::{CallOutcome, Chain, Result, RuntimeError, VM, top};

impl VM {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, chain: &mut Chain, op: OpCode) -> Result<ControlFlow> {
        match op {
            OpCode::Jump => {
                let frame = top(chain)?;
                let offset = frame.read_int()?;
                frame.jump(offset)?;
            }
            OpCode::JumpIfFalse | OpCode::JumpIfTrue => {
                let frame = top(chain)?;
                let offset = frame.read_int()?;
                let condition = frame.stack.pop()?.is_truthy();
                if condition == (op == OpCode::JumpIfTrue) {
                    frame.jump(offset)?;
                }
            }
            OpCode::Return => {
                let result = top(chain)?.stack.pop()?;
                chain.frames.pop();
                match chain.frames.last_mut() {
                    Some(caller) => caller.stack.push(result),
                    None => return Ok(ControlFlow::Return(result)),
                }
            }
            OpCode::Call | OpCode::CallOnTarget | OpCode::Thread | OpCode::ThreadOnTarget => {
                return self.execute_call(chain, op);
            }
            _ => {
                return Err(RuntimeError::InvalidBytecode(format!(
                    "execute_control: unexpected opcode {}",
                    op
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    fn execute_call(&mut self, chain: &mut Chain, op: OpCode) -> Result<ControlFlow> {
        let frame = top(chain)?;
        let argc = frame.read_int()?;
        let argc = usize::try_from(argc)
            .map_err(|_| RuntimeError::InvalidBytecode(format!("negative argument count {}", argc)))?;

        let callee = frame.stack.pop()?;
        let args = frame.stack.pop_n(argc)?;
        let target = match op {
            OpCode::CallOnTarget | OpCode::ThreadOnTarget => frame.stack.pop()?,
            _ => frame.target.clone(),
        };
        let current_file = frame.function.file.clone();
        let callee = callee_reference(&callee)?;

        if matches!(op, OpCode::Thread | OpCode::ThreadOnTarget) {
            self.spawn_thread(&callee, args, target, &current_file);
            top(chain)?.stack.push(EarleValue::Undefined);
            return Ok(ControlFlow::Continue);
        }

        let resolved = self.resolve(&callee, argc, &current_file)?;
        match self.call_resolved(chain, resolved, args, target)? {
            CallOutcome::Pushed => Ok(ControlFlow::Continue),
            CallOutcome::Value(value) => {
                top(chain)?.stack.push(value);
                Ok(ControlFlow::Continue)
            }
            CallOutcome::Pending { name, pending } => Ok(ControlFlow::Suspend { name, pending }),
        }
    }
}

/// The name a callee value refers to.
fn callee_reference(callee: &EarleValue) -> Result<VariableReference> {
    match callee {
        EarleValue::Reference(reference) | EarleValue::Function(reference) => Ok(reference.clone()),
        other => Err(RuntimeError::NotCallable(other.type_name().to_string())),
    }
}

/// What the run loop should do after an instruction.
pub enum ControlFlow {
    /// Continue execution.
    Continue,
    /// The outermost frame returned.
    Return(EarleValue),
    /// A native could not complete; the chain must be suspended.
    Suspend {
        name: String,
        pending: Box<dyn PendingNative>,
    },
}

impl fmt::Debug for ControlFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFlow::Continue => f.write_str("Continue"),
            ControlFlow::Return(value) => f.debug_tuple("Return").field(value).finish(),
            ControlFlow::Suspend { name, pending } => f
                .debug_struct("Suspend")
                .field("name", name)
                .field("pending", &pending.describe())
                .finish(),
        }
    }
}
