//! Output and reporting
//!
//! The orchestrator forwards protocol events to a reporter; reporters
//! render them and may hold mutable state across one run.

mod reporter;

pub use reporter::{ConsoleReporter, JsonReporter, Reporter};

#[cfg(test)]
pub use reporter::RecordingReporter;
