//! Worker-pool orchestration
//!
//! The coordinating side: a pure scheduling state machine plus the
//! process-spawning interpreter that wires it to real workers.

mod orchestrator;
mod state;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use state::{PoolAction, PoolConfig, PoolState};
