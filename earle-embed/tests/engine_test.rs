// earle-embed integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for the engine and its scheduler.

use std::time::Duration;

use earle_embed::{Arity, EarleValue, Engine, EngineConfig, Error, ManualClock, NativeResult};

fn engine_with(source: &str) -> (Engine, ManualClock) {
    let clock = ManualClock::new();
    let mut engine = Engine::in_memory().unwrap().with_clock(clock.clone());
    engine.load_source("main", source).unwrap();
    (engine, clock)
}

// =============================================================================
// Calls
// =============================================================================

mod calls {
    use super::*;

    #[test]
    fn immediate_call_returns_value() {
        let (mut engine, _) = engine_with("add(a, b) { return a + b; }");
        let sum: i32 = engine
            .call_as("main", "add", vec![2.into(), 3.into()])
            .unwrap();
        assert_eq!(sum, 5);
        assert_eq!(engine.pending_threads(), 0);
    }

    #[test]
    fn suspending_call_becomes_thread() {
        let (mut engine, _) = engine_with("main() { waittill(\"go\"); level.done = 1; }");
        assert_eq!(engine.call("main", "main", Vec::new()).unwrap(), None);
        assert_eq!(engine.pending_threads(), 1);

        engine.tick();
        assert_eq!(engine.pending_threads(), 1);

        engine.notify("go", EarleValue::Undefined);
        let report = engine.tick();
        assert_eq!(report.completed, 1);
        assert_eq!(report.pending, 0);
        assert_eq!(engine.level().get("done"), Some(EarleValue::Integer(1)));
    }

    #[test]
    fn call_as_rejects_suspension() {
        let (mut engine, _) = engine_with("main() { wait 1; return 1; }");
        let error = engine.call_as::<i32>("main", "main", Vec::new()).unwrap_err();
        assert!(matches!(error, Error::Suspended(name) if name == "main::main"));
    }

    #[test]
    fn conversion_errors_surface() {
        let (mut engine, _) = engine_with("main() { return \"text\"; }");
        let error = engine.call_as::<i32>("main", "main", Vec::new()).unwrap_err();
        assert!(matches!(error, Error::Type { expected: "integer", .. }));
    }

    #[test]
    fn compile_errors_surface() {
        let mut engine = Engine::in_memory().unwrap();
        let error = engine.load_source("bad", "main( {").unwrap_err();
        assert!(matches!(error, Error::Compile(_)));
    }

    #[test]
    fn runtime_errors_surface() {
        let (mut engine, _) = engine_with("main() { return missing(); }");
        let error = engine.call("main", "main", Vec::new()).unwrap_err();
        assert!(error.to_string().contains("Unknown function 'missing'"));
    }

    #[test]
    fn registered_functions_are_callable() {
        let (mut engine, _) = engine_with("main() { return greet(\"bob\"); }");
        engine.register_fn("greet", Arity::Exact(1), |args| {
            format!("hello {}", args[0])
        });
        let greeting: String = engine.call_as("main", "main", Vec::new()).unwrap();
        assert_eq!(greeting, "hello bob");
    }

    #[test]
    fn natives_can_read_target() {
        let (mut engine, _) = engine_with("main() { return whoami(); }");
        engine.register_native("whoami", Arity::Exact(0), |context, _| {
            Ok(NativeResult::Complete(context.target.clone()))
        });
        let result = engine
            .call_with_target("main", "main", Vec::new(), "player".into())
            .unwrap();
        assert_eq!(result, Some(EarleValue::string("player")));
    }
}

// =============================================================================
// Language
// =============================================================================

mod language {
    use super::*;

    const SCRIPT: &str = "
        score(values) {
            total = 0;
            for (i = 0; i < values.size; i++) {
                total += values[i];
            }
            return total;
        }

        flags(a, b) { return a | b; }

        watcher() { level.seen = waittill(\"hit\"); }

        main() {
            thread watcher();
            values = [];
            values[0] = 3;
            values[1] = 4;
            values[values.size - 1] *= 2;
            s = spawnstruct();
            s.hits = 0;
            s.hits++;
            origin = (1, 2, 3);
            offset = ((origin.x + 1), 0, 0);
            if (!isdefined(s.missing) && s.hits == 1 || 0) {
                s.hits += flags(4, 1);
            }
            notify(\"hit\", s.hits);
            return score(values) * 100 + s.hits * 10 + int(offset.x);
        }";

    #[test]
    fn script_runs_end_to_end() {
        let (mut engine, _) = engine_with(SCRIPT);
        let result = engine.call("main", "main", Vec::new()).unwrap();
        assert_eq!(result, Some(EarleValue::Integer(1162)));
        assert_eq!(engine.pending_threads(), 1);

        let report = engine.tick();
        assert_eq!(report.completed, 1);
        assert_eq!(engine.level().get("seen"), Some(EarleValue::Integer(6)));
    }

    #[test]
    fn deep_parentheses_load_quickly() {
        let depth = 16;
        let source = format!(
            "main() {{ return {}1 | 2{}; }}",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let started = std::time::Instant::now();
        let (mut engine, _) = engine_with(&source);
        let result: i32 = engine.call_as("main", "main", Vec::new()).unwrap();
        assert_eq!(result, 3);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn nul_in_string_literal_is_compile_error() {
        let mut engine = Engine::in_memory().unwrap();
        let error = engine
            .load_source("bad", "main() { return \"a\\0b\"; }")
            .unwrap_err();
        assert!(matches!(error, Error::Compile(_)));
        assert!(error.to_string().contains("NUL"), "{}", error);
    }

    #[test]
    fn compound_assignment_evaluates_target_once() {
        let source = "
            slot() { level.n++; return 0; }
            main() { level.n = 0; a = []; a[0] = 1; a[slot()] += 1; return a[0]; }";
        let (mut engine, _) = engine_with(source);
        let result: i32 = engine.call_as("main", "main", Vec::new()).unwrap();
        assert_eq!(result, 2);
        assert_eq!(engine.level().get("n"), Some(EarleValue::Integer(1)));
    }
}

// =============================================================================
// Scheduling
// =============================================================================

mod scheduling {
    use super::*;

    #[test]
    fn timed_waits_follow_clock() {
        let (mut engine, clock) = engine_with("main() { wait 0.25; level.ticked = 1; }");
        engine.call("main", "main", Vec::new()).unwrap();

        engine.tick();
        assert_eq!(engine.pending_threads(), 1);

        clock.advance(Duration::from_millis(250));
        engine.tick();
        assert_eq!(engine.pending_threads(), 0);
        assert_eq!(engine.level().get("ticked"), Some(EarleValue::Integer(1)));
    }

    #[test]
    fn threads_resume_in_spawn_order() {
        let source = "
            log(tag) { level.log = level.log + tag; }
            worker(tag) { waittillframeend(); log(tag); }
            main() { level.log = \"\"; thread worker(\"a\"); thread worker(\"b\"); thread worker(\"c\"); }";
        let (mut engine, _) = engine_with(source);
        assert!(engine.call("main", "main", Vec::new()).unwrap().is_some());
        assert_eq!(engine.pending_threads(), 3);

        let report = engine.tick();
        assert_eq!(report.completed, 3);
        assert_eq!(engine.level().get("log"), Some(EarleValue::string("abc")));
    }

    #[test]
    fn threads_spawned_during_tick_run_next_tick() {
        let source = "
            child() { level.child = level.child + 1; waittillframeend(); level.child = level.child + 10; }
            parent() { waittillframeend(); thread child(); }
            main() { level.child = 0; thread parent(); }";
        let (mut engine, _) = engine_with(source);
        engine.call("main", "main", Vec::new()).unwrap();

        let first = engine.tick();
        assert_eq!(first.completed, 1);
        assert_eq!(first.spawned, 1);
        assert_eq!(engine.level().get("child"), Some(EarleValue::Integer(1)));

        let second = engine.tick();
        assert_eq!(second.resumed, 1);
        assert_eq!(engine.level().get("child"), Some(EarleValue::Integer(11)));
    }

    #[test]
    fn endon_stops_thread() {
        let source = "main() { endon(\"death\"); while (1) { wait 0.1; level.loops++; } }";
        let (mut engine, clock) = engine_with(source);
        engine.call("main", "main", Vec::new()).unwrap();
        clock.advance(Duration::from_millis(100));
        engine.tick();
        engine.notify("death", EarleValue::Undefined);
        let report = engine.tick();
        assert_eq!(report.ended, 1);
        assert_eq!(engine.pending_threads(), 0);
    }

    #[test]
    fn failing_thread_is_reported() {
        let (mut engine, _) = engine_with("main() { waittillframeend(); return nope(); }");
        engine.call("main", "main", Vec::new()).unwrap();
        let report = engine.tick();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "main::main");
        assert_eq!(engine.pending_threads(), 0);
    }

    #[test]
    fn run_until_idle_enforces_limit() {
        let (mut engine, _) = engine_with("main() { waittill(\"never\"); }");
        engine.call("main", "main", Vec::new()).unwrap();
        let error = engine.run_until_idle(5).unwrap_err();
        assert!(matches!(error, Error::TickLimit { ticks: 5, pending: 1 }));

        engine.stop_all();
        assert_eq!(engine.run_until_idle(5).unwrap(), 0);
    }

    #[test]
    fn run_until_idle_counts_ticks() {
        let source = "main() { waittillframeend(); waittillframeend(); }";
        let (mut engine, _) = engine_with(source);
        engine.call("main", "main", Vec::new()).unwrap();
        assert_eq!(engine.run_until_idle(10).unwrap(), 2);
    }
}

// =============================================================================
// Files
// =============================================================================

mod files {
    use super::*;

    fn temp_root(name: &str) -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!("earle-embed-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(root.join("maps")).unwrap();
        root
    }

    #[test]
    fn loads_includes_from_script_root() {
        let root = temp_root("include");
        std::fs::write(root.join("maps").join("util.gsc"), "twice(n) { return n * 2; }").unwrap();
        std::fs::write(
            root.join("main.gsc"),
            "#include maps\\util;\nmain() { return twice(21); }",
        )
        .unwrap();

        let mut engine = Engine::new(EngineConfig::default().with_script_root(&root)).unwrap();
        let result: i32 = engine.call_as("main", "main", Vec::new()).unwrap();
        assert_eq!(result, 42);
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn load_file_uses_relative_logical_path() {
        let root = temp_root("load-file");
        let file = root.join("maps").join("entry.gsc");
        std::fs::write(&file, "main() { return 7; }").unwrap();

        let mut engine = Engine::new(EngineConfig::default().with_script_root(&root)).unwrap();
        let logical = engine.load_file(&file, &root).unwrap();
        assert_eq!(logical, "maps\\entry");
        assert!(engine.disassemble(&logical).unwrap().contains("== maps\\entry::main() =="));
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut engine = Engine::in_memory().unwrap();
        let root = std::path::Path::new("/nonexistent-earle-root");
        let error = engine.load_file(&root.join("main.gsc"), root).unwrap_err();
        assert!(matches!(error, Error::Io { .. }));
    }
}
