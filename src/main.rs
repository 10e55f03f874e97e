// earle - Command-line host for the Earle scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use earle_embed::{EarleValue, Engine, EngineConfig, Error, VmConfig};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "earle", version)]
#[command(about = "Run Earle scripts")]
struct Cli {
    /// Script files to load. The entry function is called in the first one.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Function to call once the files are loaded
    #[arg(long, default_value = "main")]
    entry: String,

    /// Directory `#include` paths are resolved against (defaults to the
    /// directory of the first file)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Milliseconds between scheduler ticks
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Give up if threads are still waiting after this many ticks
    #[arg(long, default_value_t = 10_000)]
    max_ticks: usize,

    /// Print the bytecode of the loaded files instead of running them
    #[arg(long)]
    disassemble: bool,

    /// Maximum call depth of a script thread
    #[arg(long, default_value_t = VmConfig::default().max_call_depth)]
    max_depth: usize,

    /// Log every executed instruction at trace level
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("EARLE_LOG").unwrap_or_else(|_| "earle=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let root = cli.root.clone().unwrap_or_else(|| default_root(&cli.files[0]));
    let config = EngineConfig::default()
        .with_script_root(&root)
        .with_max_call_depth(cli.max_depth)
        .with_trace_instructions(cli.trace);
    let mut engine = Engine::new(config)?;

    let mut loaded = Vec::with_capacity(cli.files.len());
    for file in &cli.files {
        loaded.push(engine.load_file(file, &root)?);
    }

    if cli.disassemble {
        for path in &loaded {
            print!("{}", engine.disassemble(path)?);
        }
        return Ok(());
    }

    let entry_file = &loaded[0];
    info!(file = %entry_file, entry = %cli.entry, "starting");
    match engine.call(entry_file, &cli.entry, Vec::new())? {
        Some(EarleValue::Undefined) | None => {}
        Some(value) => println!("{}", value),
    }

    let interval = Duration::from_millis(cli.tick_ms);
    let mut ticks = 0;
    while engine.pending_threads() > 0 {
        if ticks == cli.max_ticks {
            return Err(Error::TickLimit {
                ticks,
                pending: engine.pending_threads(),
            });
        }
        thread::sleep(interval);
        let report = engine.tick();
        ticks += 1;
        for failure in &report.failures {
            eprintln!("thread {} ({}) failed: {}", failure.id, failure.label, failure.error);
        }
        debug!(tick = ticks, pending = report.pending, "tick");
    }
    info!(ticks, "all threads finished");
    Ok(())
}

fn default_root(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
