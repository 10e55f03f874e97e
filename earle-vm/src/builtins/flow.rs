// earle-vm - Built-in natives for Earle
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Waiting and events: `wait`, `waittill`, `waittillframeend`, `notify`,
//! `endon`.

use std::time::Duration;

use crate::events::EventSubscription;
use crate::native::{Arity, NativeContext, NativeRegistry, NativeResult, PendingNative};
use crate::value::EarleValue;
use crate::vm::{Result, RuntimeError};

pub(super) fn register(registry: &mut NativeRegistry) {
    registry.register("wait", Arity::Exact(1), |context, args| {
        let seconds = args[0].as_number().unwrap_or(0.0).max(0.0);
        let delay = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
        Ok(NativeResult::Pending(Box::new(WaitTimer {
            deadline: context.now() + delay,
        })))
    });

    registry.register("waittill", Arity::Exact(1), |context, args| {
        let name = event_name("waittill", &args[0])?;
        Ok(NativeResult::Pending(Box::new(WaitEvent {
            subscription: context.events.subscribe(name),
        })))
    });

    registry.register("waittillframeend", Arity::Exact(0), |_, _| {
        Ok(NativeResult::Pending(Box::new(WaitFrameEnd)))
    });

    registry.register("notify", Arity::Exact(1), |context, args| {
        let name = event_name("notify", &args[0])?;
        context.events.notify(name, EarleValue::Undefined);
        Ok(NativeResult::undefined())
    });

    registry.register("notify", Arity::Exact(2), |context, args| {
        let name = event_name("notify", &args[0])?;
        context.events.notify(name, args[1].clone());
        Ok(NativeResult::undefined())
    });

    registry.register("endon", Arity::Exact(1), |context, args| {
        let name = event_name("endon", &args[0])?;
        context.end_on(name);
        Ok(NativeResult::undefined())
    });
}

fn event_name<'v>(native: &str, value: &'v EarleValue) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        RuntimeError::native(
            native,
            format!("event name must be a string, got {}", value.type_name()),
        )
    })
}

struct WaitTimer {
    deadline: Duration,
}

impl PendingNative for WaitTimer {
    fn poll(&mut self, context: &mut NativeContext<'_>) -> Result<Option<EarleValue>> {
        Ok((context.now() >= self.deadline).then_some(EarleValue::Undefined))
    }

    fn describe(&self) -> String {
        format!("wait until {:?}", self.deadline)
    }
}

struct WaitEvent {
    subscription: EventSubscription,
}

impl PendingNative for WaitEvent {
    fn poll(&mut self, _: &mut NativeContext<'_>) -> Result<Option<EarleValue>> {
        Ok(self.subscription.value())
    }

    fn describe(&self) -> String {
        format!("waittill \"{}\"", self.subscription.name())
    }
}

/// Done on the first resume.
struct WaitFrameEnd;

impl PendingNative for WaitFrameEnd {
    fn poll(&mut self, _: &mut NativeContext<'_>) -> Result<Option<EarleValue>> {
        Ok(Some(EarleValue::Undefined))
    }

    fn describe(&self) -> String {
        "waittillframeend".to_string()
    }
}
