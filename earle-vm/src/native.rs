// earle-vm - Native function registry for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Host functions callable from scripts.
//!
//! A native runs synchronously and either completes with a value or hands
//! back a [`PendingNative`]. A pending native suspends the calling chain;
//! each resume polls it until it produces the call's value.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::events::{EventBus, EventSubscription};
use crate::host::{Clock, Localizer, Printer};
use crate::value::{EarleStructure, EarleValue};
use crate::vm::Result;

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, argc: usize) -> bool {
        match *self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "{}+", n),
        }
    }
}

/// What a native call produced.
pub enum NativeResult {
    Complete(EarleValue),
    Pending(Box<dyn PendingNative>),
}

impl NativeResult {
    pub fn undefined() -> Self {
        NativeResult::Complete(EarleValue::Undefined)
    }
}

impl fmt::Debug for NativeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeResult::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            NativeResult::Pending(pending) => {
                f.debug_tuple("Pending").field(&pending.describe()).finish()
            }
        }
    }
}

/// A native call that has not finished yet.
pub trait PendingNative {
    /// `Some(value)` once the call is done.
    fn poll(&mut self, context: &mut NativeContext<'_>) -> Result<Option<EarleValue>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Everything a native can reach while it runs.
pub struct NativeContext<'a> {
    /// `self` of the calling frame.
    pub target: &'a EarleValue,
    pub events: &'a EventBus,
    pub clock: &'a dyn Clock,
    pub localizer: &'a dyn Localizer,
    pub printer: &'a dyn Printer,
    /// The `level` structure.
    pub level: &'a EarleStructure,
    end_on: &'a mut Vec<EventSubscription>,
}

impl<'a> NativeContext<'a> {
    pub(crate) fn new(
        target: &'a EarleValue,
        events: &'a EventBus,
        clock: &'a dyn Clock,
        localizer: &'a dyn Localizer,
        printer: &'a dyn Printer,
        level: &'a EarleStructure,
        end_on: &'a mut Vec<EventSubscription>,
    ) -> Self {
        NativeContext {
            target,
            events,
            clock,
            localizer,
            printer,
            level,
            end_on,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// End the calling chain when `event` fires while it is suspended.
    ///
    /// Repeating an `endon` for the same event keeps the first subscription.
    pub fn end_on(&mut self, event: &str) {
        if self.end_on.iter().any(|subscription| subscription.name() == event) {
            return;
        }
        let subscription = self.events.subscribe(event);
        self.end_on.push(subscription);
    }
}

pub type NativeHandler = Rc<dyn Fn(&mut NativeContext<'_>, &[EarleValue]) -> Result<NativeResult>>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: Arity,
    handler: NativeHandler,
}

impl NativeFunction {
    pub fn call(&self, context: &mut NativeContext<'_>, args: &[EarleValue]) -> Result<NativeResult> {
        (self.handler)(context, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Natives by lowercase name, overloaded by arity.
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    functions: HashMap<String, Vec<NativeFunction>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. Registering the same name and arity
    /// again replaces the earlier handler.
    pub fn register<F>(&mut self, name: &str, arity: Arity, handler: F)
    where
        F: Fn(&mut NativeContext<'_>, &[EarleValue]) -> Result<NativeResult> + 'static,
    {
        let name = name.to_ascii_lowercase();
        let overloads = self.functions.entry(name.clone()).or_default();
        overloads.retain(|existing| existing.arity != arity);
        overloads.push(NativeFunction {
            name,
            arity,
            handler: Rc::new(handler),
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    /// The overload accepting `argc` arguments. Exact arities win over
    /// variadic ones.
    pub fn resolve(&self, name: &str, argc: usize) -> Option<&NativeFunction> {
        let overloads = self.functions.get(&name.to_ascii_lowercase())?;
        overloads
            .iter()
            .find(|f| f.arity == Arity::Exact(argc))
            .or_else(|| overloads.iter().find(|f| f.arity.accepts(argc)))
    }

    pub fn len(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
