//! Per-case lifecycle execution
//!
//! State machine per test case: Before → Body → After → Done, with an
//! early exit to Failed when fixture setup breaks. Every step isolates
//! panics and error returns into the serialized error shape so one
//! case's failure cannot abort its siblings.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::executor::taint;
use crate::models::{CaseReport, SerializedError, TestCaseRef};
use crate::registry::{CaseContext, CaseFn, SetupFn, TestCase};
use crate::utils::Timer;

/// Run one declared case to completion and produce its report.
pub async fn run_case(case: &TestCase, file_name: &str, index: usize) -> CaseReport {
    let test_case = TestCaseRef {
        title: case.name.clone(),
        file_name: file_name.to_string(),
        index,
    };
    let mut cx = CaseContext::new(&case.name);

    if let Some(before) = &case.before {
        match guard_setup(before, cx.clone()).await {
            Ok(state) => cx.state = state,
            Err(error) => {
                // Broken fixture setup is unrecoverable for this case:
                // body and after are skipped entirely.
                debug!(case = %case.name, %error, "before hook failed");
                return CaseReport::failed(test_case, error, 0);
            }
        }
    }

    let timer = Timer::start(&case.name);
    let body_outcome = guard_case(&case.body, cx.clone()).await;
    let duration_ms = timer.elapsed_ms();

    let report = match body_outcome {
        Ok(()) => CaseReport::passed(test_case, duration_ms),
        Err(error) => CaseReport::failed(test_case, error, duration_ms),
    };

    // Teardown always runs once setup succeeded, whatever the body did.
    // Its failure is logged and swallowed; the report above stands.
    if let Some(after) = &case.after {
        if let Err(error) = guard_case(after, cx).await {
            warn!(case = %case.name, %error, "after hook failed");
        }
    }

    report
}

async fn guard_setup(hook: &SetupFn, cx: CaseContext) -> Result<Value, SerializedError> {
    let _scope = taint::CaseScope::enter();
    match AssertUnwindSafe(hook(cx)).catch_unwind().await {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(err)) => Err(SerializedError::from_error(&err)),
        Err(payload) => Err(SerializedError::from_panic(payload)),
    }
}

async fn guard_case(hook: &CaseFn, cx: CaseContext) -> Result<(), SerializedError> {
    let _scope = taint::CaseScope::enter();
    match AssertUnwindSafe(hook(cx)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SerializedError::from_error(&err)),
        Err(payload) => Err(SerializedError::from_panic(payload)),
    }
}
