//! Worker runtime
//!
//! The top-level routine run inside each spawned worker process. Owns
//! exactly one assigned test file: loads it, optionally filters the
//! declared cases, drives the case runner strictly in declaration
//! order, and emits protocol messages as it goes.

use std::path::PathBuf;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info};

use crate::build::ArtifactResolver;
use crate::config::TEST_ENV_VAR;
use crate::executor::{case_runner, taint};
use crate::models::TestCaseRef;
use crate::protocol::{Message, MessageSink};
use crate::registry::{SuiteSet, TestRegistry};

/// Process-start parameters for one worker.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub file: PathBuf,
    pub artifact_dir: PathBuf,
    pub ident: u32,
    pub filter: Option<Regex>,
}

/// Execute the assigned file and return the worker's exit code:
/// 0 if every reported test passed and the process was never tainted,
/// 1 otherwise.
pub async fn run_worker(
    config: &WorkerConfig,
    suites: &SuiteSet,
    sink: &mut dyn MessageSink,
) -> Result<i32> {
    taint::install_hook();

    // Application code under test can key off this marker.
    if std::env::var_os(TEST_ENV_VAR).is_none() {
        std::env::set_var(TEST_ENV_VAR, "test");
    }

    let file_name = config.file.to_string_lossy().to_string();
    let artifact = ArtifactResolver::new(&config.artifact_dir).resolve(&config.file);
    debug!(
        ident = config.ident,
        file = %file_name,
        artifact = %artifact.display(),
        "loading test file"
    );

    let mut registry = TestRegistry::new();
    if let Err(err) = suites.load(&file_name, &mut registry) {
        sink.emit(&Message::TestError {
            error: err.to_string(),
        })?;
        return Ok(1);
    }

    let mut cases = registry.drain();
    let declared = cases.len();
    if let Some(filter) = &config.filter {
        cases.retain(|case| filter.is_match(&case.name));
    }

    if cases.is_empty() {
        let error = if declared == 0 {
            format!("no tests found in {file_name}")
        } else {
            format!("no tests in {file_name} match the filter")
        };
        sink.emit(&Message::TestError { error })?;
        return Ok(exit_code(true));
    }

    sink.emit(&Message::RunStart {
        num_files: cases.len(),
        max_child_count: None,
    })?;

    let mut all_passed = true;
    for (index, case) in cases.iter().enumerate() {
        sink.emit(&Message::TestStart(TestCaseRef {
            title: case.name.clone(),
            file_name: file_name.clone(),
            index,
        }))?;

        let report = case_runner::run_case(case, &file_name, index).await;
        all_passed &= report.passed;
        sink.emit(&Message::TestResult(report))?;
    }

    info!(
        ident = config.ident,
        file = %file_name,
        cases = cases.len(),
        passed = all_passed,
        "worker finished"
    );
    Ok(exit_code(all_passed))
}

fn exit_code(all_passed: bool) -> i32 {
    if all_passed && !taint::is_tainted() {
        0
    } else {
        1
    }
}
