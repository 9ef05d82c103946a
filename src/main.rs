//! testpool - Process-isolated parallel test file runner
//!
//! Executes a project's test files by distributing them across a
//! bounded pool of isolated worker processes, streaming structured
//! progress and result events back to the coordinating process, and
//! producing a single pass/fail verdict and process exit code.
//!
//! ## Features
//!
//! - One worker process per test file, at most `--max-children` at once
//! - Per-case before/body/after lifecycle with failure isolation
//! - Streaming JSON-lines protocol between workers and the coordinator
//! - Console and JSON reporters
//! - Watch mode re-running the cycle on recompilation signals
//!
//! ## Usage
//!
//! ```bash
//! # Run every registered test file
//! testpool run
//!
//! # Run selected files with two workers
//! testpool run selftest/arith.tp selftest/fixtures.tp --max-children 2
//!
//! # Only cases whose name matches a pattern
//! testpool run --filter 'fixture'
//!
//! # List registered files
//! testpool list --detailed
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use tracing::info;

mod build;
mod cli;
mod config;
mod executor;
mod models;
mod output;
mod pool;
mod protocol;
mod registry;
mod suites;
mod utils;

use build::{ArtifactResolver, PrebuiltArtifacts};
use config::EnvConfig;
use executor::WorkerConfig;
use output::{ConsoleReporter, JsonReporter, Reporter};
use pool::{Orchestrator, OrchestratorConfig};
use protocol::StdoutSink;
use registry::TestRegistry;
use utils::LogLevel;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let env = EnvConfig::load();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        env.log
            .as_deref()
            .and_then(LogLevel::from_str)
            .unwrap_or(LogLevel::Info)
    };
    utils::init_logger(level);
    if env.has_any() {
        tracing::debug!("applying TESTPOOL_* environment overrides");
    }

    match args.command {
        cli::Command::Run(run_args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            let code = runtime.block_on(run_tests(run_args, env))?;
            std::process::exit(code);
        }
        cli::Command::Child(child_args) => {
            // Workers are internally single-threaded; cases within a
            // file execute strictly in sequence.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let code = runtime.block_on(run_child(child_args))?;
            std::process::exit(code);
        }
        cli::Command::List(list_args) => {
            list_files(list_args);
            Ok(())
        }
    }
}

async fn run_tests(args: cli::RunArgs, env: EnvConfig) -> Result<i32> {
    let max_children = args.max_children.or(env.max_children).unwrap_or(4).max(1);
    let artifact_dir = args
        .artifact_dir
        .or(env.artifact_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("build"));
    let filter = args.filter.or(env.filter);
    if let Some(pattern) = &filter {
        // Fail up front rather than from inside every worker.
        Regex::new(pattern).with_context(|| format!("invalid test-name filter: {pattern}"))?;
    }

    let files = if args.files.is_empty() {
        suites::catalog().paths().iter().map(PathBuf::from).collect()
    } else {
        args.files
    };

    let colorize = !args.no_color && !env.no_color.unwrap_or(false);
    let reporter: Box<dyn Reporter> = match args.format.as_str() {
        "json" => Box::new(JsonReporter::new()),
        _ => Box::new(ConsoleReporter::new(colorize)),
    };

    let config = OrchestratorConfig {
        files,
        max_children,
        fail_fast: !args.no_fail_fast && !args.watch,
        artifact_dir: artifact_dir.clone(),
        filter,
    };

    let mut compiler = PrebuiltArtifacts::new(&artifact_dir);
    let mut orchestrator = Orchestrator::new(config, reporter);

    if args.watch {
        info!("watch mode: re-running on recompilation signals");
        orchestrator.run_watch(&mut compiler).await
    } else {
        orchestrator.run(&mut compiler).await
    }
}

async fn run_child(args: cli::ChildArgs) -> Result<i32> {
    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid test-name filter")?;

    let config = WorkerConfig {
        file: args.file,
        artifact_dir: args.artifact_dir,
        ident: args.ident,
        filter,
    };

    let mut sink = StdoutSink;
    executor::run_worker(&config, &suites::catalog(), &mut sink).await
}

fn list_files(args: cli::ListArgs) {
    let suites = suites::catalog();
    let resolver = ArtifactResolver::new("build");

    println!("\nRegistered test files ({} total)\n", suites.len());
    println!("──────────────────────────────────────────────────────────────");

    for path in suites.paths() {
        let mut registry = TestRegistry::new();
        let _ = suites.load(path, &mut registry);
        let cases = registry.drain();

        println!("  {:32} {:2} case(s)", path, cases.len());
        if args.detailed {
            for case in &cases {
                println!("      - {}", case.name);
            }
            println!(
                "      artifact: {}",
                resolver.resolve(Path::new(path)).display()
            );
        }
    }

    println!("──────────────────────────────────────────────────────────────\n");
}
