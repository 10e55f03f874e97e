// earle-vm - Bytecode compiler and virtual machine for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Suspended chains.
//!
//! A suspended chain is stored as linked arena nodes:
//! `Chain -> outermost Frame -> ... -> innermost Frame -> Native`.
//! The host holds a [`Suspension`] naming the `Chain` node. Resuming takes
//! every node out of the arena; a chain that suspends again is stored anew.

use std::fmt;

use crate::events::EventSubscription;
use crate::native::PendingNative;
use crate::value::EarleValue;

use super::frame::CallFrame;

/// Generational index into a [`ContinuationArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

pub enum Continuation {
    /// Root of a suspended chain.
    Chain {
        label: String,
        end_on: Vec<EventSubscription>,
        next: ContinuationId,
    },
    Frame {
        frame: CallFrame,
        next: ContinuationId,
    },
    /// The native call the chain is waiting on.
    Native {
        name: String,
        pending: Box<dyn PendingNative>,
    },
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Chain { label, next, .. } => f
                .debug_struct("Chain")
                .field("label", label)
                .field("next", next)
                .finish(),
            Continuation::Frame { frame, next } => f
                .debug_struct("Frame")
                .field("function", &frame.function.qualified_name())
                .field("ip", &frame.ip)
                .field("next", next)
                .finish(),
            Continuation::Native { name, pending } => f
                .debug_struct("Native")
                .field("name", name)
                .field("pending", &pending.describe())
                .finish(),
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Continuation>,
}

#[derive(Default)]
pub struct ContinuationArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ContinuationArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Continuation) -> ContinuationId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                ContinuationId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ContinuationId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Remove a node. Its id is dead from then on.
    pub fn take(&mut self, id: ContinuationId) -> Option<Continuation> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    pub fn get(&self, id: ContinuationId) -> Option<&Continuation> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ContinuationArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationArena")
            .field("live", &self.len())
            .finish()
    }
}

/// Handle to a suspended chain. Resuming consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Suspension {
    pub(crate) root: ContinuationId,
    label: String,
}

impl Suspension {
    pub(crate) fn new(root: ContinuationId, label: String) -> Self {
        Suspension { root, label }
    }

    pub fn id(&self) -> ContinuationId {
        self.root
    }

    /// The function the chain was started with.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Result of running a chain until it stops.
#[derive(Debug)]
pub enum Invocation {
    Complete(EarleValue),
    /// The chain is waiting on a native.
    Incomplete(Suspension),
    /// An `endon` event fired while the chain was suspended.
    Ended { event: String },
}

impl Invocation {
    pub fn is_complete(&self) -> bool {
        matches!(self, Invocation::Complete(_))
    }

    pub fn value(&self) -> Option<&EarleValue> {
        match self {
            Invocation::Complete(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_suspension(self) -> Option<Suspension> {
        match self {
            Invocation::Incomplete(suspension) => Some(suspension),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl PendingNative for Never {
        fn poll(
            &mut self,
            _: &mut crate::native::NativeContext<'_>,
        ) -> crate::vm::Result<Option<EarleValue>> {
            Ok(None)
        }

        fn describe(&self) -> String {
            "never".to_string()
        }
    }

    fn native() -> Continuation {
        Continuation::Native {
            name: "never".to_string(),
            pending: Box::new(Never),
        }
    }

    #[test]
    fn test_take_invalidates_id() {
        let mut arena = ContinuationArena::new();
        let id = arena.insert(native());
        assert!(arena.get(id).is_some());
        assert!(arena.take(id).is_some());
        assert!(arena.take(id).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_reused_slot_rejects_stale_id() {
        let mut arena = ContinuationArena::new();
        let stale = arena.insert(native());
        arena.take(stale);
        let fresh = arena.insert(native());
        assert_ne!(stale, fresh);
        assert!(arena.get(stale).is_none());
        assert!(arena.get(fresh).is_some());
        assert_eq!(arena.len(), 1);
    }
}
