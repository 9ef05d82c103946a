//! Data models for test execution
//!
//! Contains the result and statistics structures shared by the worker
//! runtime and the orchestrator.

mod case;
mod stats;

pub use case::{CaseReport, SerializedError, TestCaseRef};
pub use stats::RunStats;
