//! Test execution engine
//!
//! Runs inside each spawned worker process: drives the per-case
//! lifecycle and emits protocol messages for one assigned test file.

mod case_runner;
mod taint;
mod worker;

pub use case_runner::run_case;
pub use worker::{run_worker, WorkerConfig};
