// earle-vm - Shared integration test helpers
// Copyright (c) 2025 Tom Waddington. MIT licensed.

#![allow(dead_code)]

use earle_vm::{
    CapturedOutput, EarleValue, Invocation, ManualClock, MemorySource, Program, RuntimeError, VM,
};

/// A VM over the given `(path, source)` files, printing into a buffer and
/// driven by a manual clock.
pub fn vm_with(files: &[(&str, &str)]) -> (VM, CapturedOutput, ManualClock) {
    let mut source = MemorySource::new();
    for (path, text) in files {
        source.insert(path, text);
    }
    let program = Program::new(source).expect("grammar builds");
    let mut vm = VM::new(program);
    let output = CapturedOutput::new();
    let clock = ManualClock::new();
    vm.set_printer(output.clone());
    vm.set_clock(clock.clone());
    (vm, output, clock)
}

/// Call `name` in a single file `main` holding `source`.
pub fn call(source: &str, name: &str, args: Vec<EarleValue>) -> Result<EarleValue, RuntimeError> {
    let (mut vm, _, _) = vm_with(&[("main", source)]);
    match vm.invoke("main", name, args)? {
        Invocation::Complete(value) => Ok(value),
        other => panic!("expected {} to complete, got {:?}", name, other),
    }
}

/// Run `main()` in `source` and return its result.
pub fn run(source: &str) -> EarleValue {
    call(source, "main", Vec::new()).expect("script runs")
}

pub fn int(value: i32) -> EarleValue {
    EarleValue::Integer(value)
}

pub fn string(value: &str) -> EarleValue {
    EarleValue::string(value)
}
