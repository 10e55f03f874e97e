// earle-vm - Suspension and resumption tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

mod common;

use std::time::Duration;

use common::{int, string, vm_with};
use earle_vm::{EarleValue, Invocation, RuntimeError, Suspension, VM};

fn suspended(invocation: Invocation) -> Suspension {
    match invocation {
        Invocation::Incomplete(suspension) => suspension,
        other => panic!("expected a suspension, got {:?}", other),
    }
}

fn completed(invocation: Invocation) -> EarleValue {
    match invocation {
        Invocation::Complete(value) => value,
        other => panic!("expected completion, got {:?}", other),
    }
}

fn start(vm: &mut VM, name: &str) -> Suspension {
    suspended(vm.invoke("main", name, Vec::new()).unwrap())
}

#[test]
fn test_waittill_receives_notified_value() {
    let (mut vm, _, _) = vm_with(&[(
        "main",
        "main() { v = waittill(\"E\"); return v + 1; }",
    )]);
    let suspension = start(&mut vm, "main");
    assert_eq!(suspension.label(), "main::main");

    // Not fired yet: the chain suspends again under a new handle.
    let again = suspended(vm.resume(suspension).unwrap());
    assert_eq!(vm.notify("E", int(7)), 1);
    assert_eq!(completed(vm.resume(again).unwrap()), int(8));
}

#[test]
fn test_suspension_inside_nested_calls() {
    let source = "
        inner() { return waittill(\"go\") * 2; }
        middle() { x = 1; return x + inner(); }
        main() { return middle() + 100; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    let suspension = start(&mut vm, "main");
    vm.notify("go", int(5));
    assert_eq!(completed(vm.resume(suspension).unwrap()), int(111));
}

#[test]
fn test_operator_resumes_with_evaluated_left_operand() {
    let source = "
        left() { a = 3; return a + waittill(\"E\"); }
        right() { b = 3; return waittill(\"E\") - b; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    let left = start(&mut vm, "left");
    let right = start(&mut vm, "right");
    assert_eq!(vm.notify("E", int(10)), 2);
    assert_eq!(completed(vm.resume(left).unwrap()), int(13));
    assert_eq!(completed(vm.resume(right).unwrap()), int(7));
}

#[test]
fn test_timed_wait_uses_clock() {
    let source = "main() { level.stage = 1; wait 0.5; level.stage = 2; wait(1); return \"done\"; }";
    let (mut vm, _, clock) = vm_with(&[("main", source)]);
    let mut suspension = start(&mut vm, "main");
    assert_eq!(vm.level().get("stage"), Some(int(1)));

    clock.advance(Duration::from_millis(400));
    suspension = suspended(vm.resume(suspension).unwrap());
    assert_eq!(vm.level().get("stage"), Some(int(1)));

    clock.advance(Duration::from_millis(100));
    suspension = suspended(vm.resume(suspension).unwrap());
    assert_eq!(vm.level().get("stage"), Some(int(2)));

    clock.advance(Duration::from_secs(1));
    assert_eq!(completed(vm.resume(suspension).unwrap()), string("done"));
}

#[test]
fn test_waittillframeend_completes_on_next_resume() {
    let (mut vm, _, _) = vm_with(&[("main", "main() { waittillframeend(); return 1; }")]);
    let suspension = start(&mut vm, "main");
    assert_eq!(completed(vm.resume(suspension).unwrap()), int(1));
}

#[test]
fn test_endon_ends_waiting_chain() {
    let source = "main() { endon(\"stop\"); waittill(\"never\"); level.reached = 1; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    let suspension = start(&mut vm, "main");
    vm.notify("stop", EarleValue::Undefined);
    match vm.resume(suspension).unwrap() {
        Invocation::Ended { event } => assert_eq!(event, "stop"),
        other => panic!("expected the chain to end, got {:?}", other),
    }
    assert_eq!(vm.level().get("reached"), None);
}

#[test]
fn test_script_notify_wakes_other_chain() {
    let source = "
        waiter() { return waittill(\"ping\"); }
        pinger() { notify(\"ping\", \"pong\"); return 0; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    let waiter = start(&mut vm, "waiter");
    completed(vm.invoke("main", "pinger", Vec::new()).unwrap());
    assert_eq!(completed(vm.resume(waiter).unwrap()), string("pong"));
}

#[test]
fn test_thread_runs_independently() {
    let source = "
        worker(n) { level.started = n; waittill(\"go\"); level.finished = n; }
        main() { thread worker(4); return 1; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    assert_eq!(completed(vm.invoke("main", "main", Vec::new()).unwrap()), int(1));
    assert_eq!(vm.level().get("started"), Some(int(4)));

    let mut spawned = vm.take_spawned();
    assert_eq!(spawned.len(), 1);
    assert!(vm.take_spawned().is_empty());

    vm.notify("go", EarleValue::Undefined);
    let worker = spawned.remove(0);
    assert_eq!(completed(vm.resume(worker).unwrap()), EarleValue::Undefined);
    assert_eq!(vm.level().get("finished"), Some(int(4)));
}

#[test]
fn test_failing_thread_does_not_affect_parent() {
    let source = "main() { thread missing(); return 2; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    assert_eq!(completed(vm.invoke("main", "main", Vec::new()).unwrap()), int(2));
    assert!(vm.take_spawned().is_empty());
}

#[test]
fn test_thread_on_target() {
    let source = "
        mark() { self.marked = 1; }
        main() { s = spawnstruct(); s thread mark(); return s.marked; }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    assert_eq!(completed(vm.invoke("main", "main", Vec::new()).unwrap()), int(1));
}

#[test]
fn test_handle_from_other_vm_is_rejected() {
    let (mut first, _, _) = vm_with(&[("main", "main() { waittill(\"E\"); }")]);
    let (mut second, _, _) = vm_with(&[("main", "main() { return 1; }")]);
    let suspension = start(&mut first, "main");
    assert!(matches!(
        second.resume(suspension),
        Err(RuntimeError::InvalidResumption)
    ));
}

#[test]
fn test_discard_drops_chain() {
    let (mut vm, _, _) = vm_with(&[("main", "main() { waittill(\"E\"); }")]);
    let suspension = start(&mut vm, "main");
    assert!(vm.discard(suspension));
    assert_eq!(vm.notify("E", EarleValue::Undefined), 0);
}

#[test]
fn test_repeated_endon_subscribes_once() {
    let source = "
        main() {
            for (i = 0; i < 50; i++) {
                endon(\"death\");
            }
            waittill(\"never\");
        }";
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    let suspension = start(&mut vm, "main");
    assert_eq!(vm.events().listener_count("death"), 1);
    assert_eq!(vm.events().listener_count("never"), 1);

    assert!(vm.discard(suspension));
    assert_eq!(vm.events().listener_count("death"), 0);
    assert_eq!(vm.events().listener_count("never"), 0);
}
