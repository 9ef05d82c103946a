//! Suite catalog
//!
//! Maps source-file paths to the functions that declare their cases.
//! Loading a file in this runner means invoking its suite function with
//! a fresh registry; unknown paths surface as a `test_error`, not a
//! process failure.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::registry::TestRegistry;

/// A suite function declares cases into the registry it is handed.
pub type SuiteFn = fn(&mut TestRegistry);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SuiteError {
    #[error("no test file registered for {0}")]
    UnknownSuite(String),
}

/// The set of test files this binary knows how to execute.
#[derive(Default)]
pub struct SuiteSet {
    suites: BTreeMap<String, SuiteFn>,
}

impl SuiteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suite under its source path. Re-registering a path
    /// replaces the previous suite.
    pub fn register(&mut self, path: impl Into<String>, suite: SuiteFn) {
        self.suites.insert(path.into(), suite);
    }

    /// Execute the suite for `path`, accumulating its declarations into
    /// `registry`.
    pub fn load(&self, path: &str, registry: &mut TestRegistry) -> Result<(), SuiteError> {
        let suite = self
            .suites
            .get(path)
            .ok_or_else(|| SuiteError::UnknownSuite(path.to_string()))?;

        suite(registry);
        debug!(path, cases = registry.len(), "loaded test file");
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.suites.contains_key(path)
    }

    /// Registered source paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.suites.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
