//! CLI argument parsing
//!
//! Defines the command-line interface using clap. The same binary is
//! both the orchestrator (`run`) and the worker (`child`, spawned
//! internally and hidden from help output).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Process-isolated parallel test file runner
#[derive(Parser, Debug)]
#[command(name = "testpool")]
#[command(version)]
#[command(about = "Run test files across a bounded pool of worker processes")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test files
    Run(RunArgs),

    /// List the test files this binary knows about
    List(ListArgs),

    /// Worker entry point: execute one assigned test file
    #[command(hide = true)]
    Child(ChildArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Test files to run (defaults to every registered file)
    pub files: Vec<PathBuf>,

    /// Maximum number of concurrent worker processes [default: 4]
    #[arg(short, long)]
    pub max_children: Option<usize>,

    /// Directory holding pre-built artifacts [default: build]
    #[arg(short, long)]
    pub artifact_dir: Option<PathBuf>,

    /// Only run test cases whose name matches this regular expression
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Keep running after a worker fails instead of aborting the run
    #[arg(long)]
    pub no_fail_fast: bool,

    /// Re-run the whole cycle on each recompilation signal
    #[arg(short, long)]
    pub watch: bool,

    /// Output format (console, json)
    #[arg(long, default_value = "console")]
    pub format: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for the hidden child command (worker start parameters)
#[derive(Parser, Debug)]
pub struct ChildArgs {
    /// The assigned test file
    #[arg(long)]
    pub file: PathBuf,

    /// Directory holding pre-built artifacts
    #[arg(long)]
    pub artifact_dir: PathBuf,

    /// Numeric worker identity
    #[arg(long)]
    pub ident: u32,

    /// Optional test-name filter
    #[arg(long)]
    pub filter: Option<String>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show each file's declared cases and artifact path
    #[arg(short, long)]
    pub detailed: bool,
}
