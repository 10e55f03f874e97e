// earle-vm - Event bus for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Named events with one-shot subscriptions.
//!
//! `waittill` and `endon` subscribe; `notify` delivers to every live
//! subscription under the name, in subscription order, and clears them.
//! A subscription that was dropped before the event fired is skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::value::EarleValue;

type Slot = Rc<RefCell<Option<EarleValue>>>;

/// A pending interest in one occurrence of an event.
pub struct EventSubscription {
    name: Rc<str>,
    slot: Slot,
}

impl EventSubscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fired(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The delivered value, if the event has fired.
    pub fn value(&self) -> Option<EarleValue> {
        self.slot.borrow().clone()
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("name", &self.name)
            .field("fired", &self.fired())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<HashMap<String, Vec<Weak<RefCell<Option<EarleValue>>>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, name: &str) -> EventSubscription {
        let slot: Slot = Rc::new(RefCell::new(None));
        let mut listeners = self.listeners.borrow_mut();
        let slots = listeners.entry(name.to_string()).or_default();
        // Subscriptions owned by discarded chains never see a notify.
        slots.retain(|slot| slot.strong_count() > 0);
        slots.push(Rc::downgrade(&slot));
        EventSubscription {
            name: Rc::from(name),
            slot,
        }
    }

    /// Fire `name` with `value`. Returns how many subscriptions received it.
    pub fn notify(&self, name: &str, value: EarleValue) -> usize {
        let waiting = self.listeners.borrow_mut().remove(name).unwrap_or_default();
        let mut delivered = 0;
        for slot in waiting.iter().filter_map(Weak::upgrade) {
            let mut slot = slot.borrow_mut();
            if slot.is_none() {
                *slot = Some(value.clone());
                delivered += 1;
            }
        }
        trace!(event = name, delivered, "event notified");
        delivered
    }

    /// Live subscriptions waiting on `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .borrow()
            .get(name)
            .map_or(0, |slots| slots.iter().filter(|s| s.strong_count() > 0).count())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_struct("EventBus")
            .field("events", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}
