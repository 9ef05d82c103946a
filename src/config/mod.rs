//! Runtime configuration
//!
//! Environment-variable overrides for CLI defaults. Config-file loading
//! belongs to the outer tool, not the execution core.

mod env;

pub use env::EnvConfig;

/// Test-mode marker visible to application code under test; set by the
/// worker before loading a file if not already present.
pub const TEST_ENV_VAR: &str = "TESTPOOL_ENV";
