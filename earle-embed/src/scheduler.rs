// earle-embed - Cooperative scheduler for script threads
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Round-robin resumption of suspended chains.
//!
//! Each tick resumes every waiting thread once, in spawn order. Threads
//! started while a tick is running (by `thread` calls inside resumed
//! scripts) join the queue and are first resumed on the following tick.

use earle_vm::{Invocation, RuntimeError, Suspension, VM};
use tracing::{debug, trace, warn};

/// A suspended chain owned by the scheduler.
#[derive(Debug)]
pub struct ScriptThread {
    id: u64,
    suspension: Suspension,
}

impl ScriptThread {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        self.suspension.label()
    }
}

/// A thread that stopped with a runtime error.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadFailure {
    pub id: u64,
    pub label: String,
    pub error: RuntimeError,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub resumed: usize,
    pub completed: usize,
    /// Threads stopped by an `endon` event.
    pub ended: usize,
    /// Threads started during the tick.
    pub spawned: usize,
    pub failures: Vec<ThreadFailure>,
    /// Threads still waiting after the tick.
    pub pending: usize,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    threads: Vec<ScriptThread>,
    next_id: u64,
    ticks: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a suspended chain. Returns its thread id.
    pub fn spawn(&mut self, suspension: Suspension) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        debug!(thread = id, label = suspension.label(), "thread queued");
        self.threads.push(ScriptThread { id, suspension });
        id
    }

    /// Queue the chains `vm` started through `thread` calls.
    pub fn adopt_spawned(&mut self, vm: &mut VM) -> usize {
        let spawned = vm.take_spawned();
        let count = spawned.len();
        for suspension in spawned {
            self.spawn(suspension);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn threads(&self) -> impl Iterator<Item = &ScriptThread> {
        self.threads.iter()
    }

    /// Drop every waiting thread from `vm`.
    pub fn clear(&mut self, vm: &mut VM) {
        for thread in self.threads.drain(..) {
            vm.discard(thread.suspension);
        }
    }

    /// Resume every waiting thread once.
    pub fn tick(&mut self, vm: &mut VM) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();
        let waiting = std::mem::take(&mut self.threads);

        for ScriptThread { id, suspension } in waiting {
            let label = suspension.label().to_string();
            report.resumed += 1;
            match vm.resume(suspension) {
                Ok(Invocation::Complete(value)) => {
                    trace!(thread = id, label = %label, %value, "thread completed");
                    report.completed += 1;
                }
                Ok(Invocation::Ended { event }) => {
                    debug!(thread = id, label = %label, event = %event, "thread ended");
                    report.ended += 1;
                }
                Ok(Invocation::Incomplete(suspension)) => {
                    self.threads.push(ScriptThread { id, suspension });
                }
                Err(error) => {
                    warn!(thread = id, label = %label, %error, "thread failed");
                    report.failures.push(ThreadFailure { id, label, error });
                }
            }
        }

        report.spawned = self.adopt_spawned(vm);
        report.pending = self.threads.len();
        trace!(
            tick = self.ticks,
            resumed = report.resumed,
            completed = report.completed,
            pending = report.pending,
            "tick"
        );
        report
    }
}
