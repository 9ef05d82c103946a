//! Self-check suites
//!
//! Known-outcome test files used to verify the runner end to end.

use anyhow::{bail, ensure};
use serde_json::json;

use crate::config::TEST_ENV_VAR;
use crate::registry::{CaseSpec, SuiteSet, TestRegistry};

pub fn register(suites: &mut SuiteSet) {
    suites.register("selftest/arith.tp", arith);
    suites.register("selftest/fixtures.tp", fixtures);
    suites.register("selftest/failing.tp", failing);
    suites.register("selftest/broken_fixture.tp", broken_fixture);
}

/// Three unconditionally passing cases.
fn arith(registry: &mut TestRegistry) {
    registry.case("adds integers", |_cx| async {
        ensure!(2 + 2 == 4, "arithmetic is broken");
        Ok(())
    });

    registry.case("formats strings", |_cx| async {
        let greeting = format!("hello {}", "pool");
        ensure!(greeting == "hello pool", "got {greeting}");
        Ok(())
    });

    registry.case("sees the test environment marker", |_cx| async {
        ensure!(
            std::env::var(TEST_ENV_VAR).is_ok(),
            "{TEST_ENV_VAR} not set for code under test"
        );
        Ok(())
    });
}

/// Exercises before/body/after state threading.
fn fixtures(registry: &mut TestRegistry) {
    registry.case_with(
        "reads fixture state",
        |_cx| async { Ok(json!({"base_url": "http://localhost:0", "retries": 2})) },
        |cx| async move {
            ensure!(cx.state["retries"] == 2, "fixture state missing");
            Ok(())
        },
    );

    registry.add(
        "runs teardown after body",
        CaseSpec::new(|cx| async move {
            ensure!(cx.state["ready"] == true, "setup did not run first");
            Ok(())
        })
        .before(|_cx| async { Ok(json!({"ready": true})) })
        .after(|_cx| async { Ok(()) }),
    );

    registry.case("receives its own name", |cx| async move {
        ensure!(cx.test_case_name == "receives its own name");
        Ok(())
    });
}

/// One pass, one deliberate failure. The worker for this file must exit 1.
fn failing(registry: &mut TestRegistry) {
    registry.case("ok", |_cx| async { Ok(()) });

    registry.case("fails", |_cx| async {
        bail!("deliberate failure: expected 2, got 3");
    });
}

/// A case whose fixture setup breaks: body and after must be skipped.
fn broken_fixture(registry: &mut TestRegistry) {
    registry.add(
        "never runs its body",
        CaseSpec::new(|_cx| async {
            bail!("body must not run when before fails");
        })
        .before(|_cx| async { bail!("fixture refused to start") })
        .after(|_cx| async {
            bail!("after must not run when before fails");
        }),
    );
}
