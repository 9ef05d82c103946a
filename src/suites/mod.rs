//! Built-in test suites
//!
//! The suites this binary ships with. They double as an end-to-end
//! check of the runner itself: a few always-green files plus files that
//! fail in known ways, so the pool, protocol, and exit-code paths can
//! be exercised against a real process tree.

mod selfcheck;

use crate::registry::SuiteSet;

/// Catalog of every test file this binary can execute.
pub fn catalog() -> SuiteSet {
    let mut suites = SuiteSet::new();
    selfcheck::register(&mut suites);
    suites
}
