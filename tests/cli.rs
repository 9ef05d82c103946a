//! End-to-end tests against the built binary
//!
//! Spawns the real orchestrator/worker process tree over the built-in
//! self-check suites and asserts on the wire protocol, console output,
//! and process exit codes.

use std::process::Command;

use serde_json::Value;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_testpool")
}

/// Run `testpool child` for one file and collect its protocol messages.
fn run_child(file: &str, extra: &[&str]) -> (Vec<Value>, i32) {
    let output = Command::new(bin())
        .args(["child", "--file", file, "--artifact-dir", "build", "--ident", "0"])
        .args(extra)
        .output()
        .expect("failed to spawn worker");

    let stdout = String::from_utf8(output.stdout).expect("worker stdout not utf-8");
    let messages = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("non-protocol line on worker stdout"))
        .collect();
    (messages, output.status.code().unwrap_or(-1))
}

fn kinds(messages: &[Value]) -> Vec<&str> {
    messages
        .iter()
        .map(|m| m["kind"].as_str().unwrap())
        .collect()
}

fn results<'a>(messages: &'a [Value]) -> Vec<&'a Value> {
    messages
        .iter()
        .filter(|m| m["kind"] == "test_result")
        .collect()
}

#[test]
fn worker_streams_results_in_declaration_order() {
    let (messages, code) = run_child("selftest/arith.tp", &[]);

    assert_eq!(code, 0);
    assert_eq!(
        kinds(&messages),
        [
            "run_start",
            "test_start",
            "test_result",
            "test_start",
            "test_result",
            "test_start",
            "test_result",
        ]
    );

    let results = results(&messages);
    let titles: Vec<&str> = results
        .iter()
        .map(|r| r["testCase"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        [
            "adds integers",
            "formats strings",
            "sees the test environment marker",
        ]
    );
    assert!(results.iter().all(|r| r["passed"] == true));
    assert!(results
        .iter()
        .enumerate()
        .all(|(i, r)| r["testCase"]["index"] == i));
}

#[test]
fn failing_case_populates_error_and_exit_code() {
    let (messages, code) = run_child("selftest/failing.tp", &[]);

    assert_eq!(code, 1);
    let results = results(&messages);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["passed"], true);
    assert_eq!(results[1]["passed"], false);
    let message = results[1]["error"]["message"].as_str().unwrap();
    assert!(message.contains("expected 2, got 3"), "got: {message}");
}

#[test]
fn broken_fixture_short_circuits_the_case() {
    let (messages, code) = run_child("selftest/broken_fixture.tp", &[]);

    assert_eq!(code, 1);
    let results = results(&messages);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["passed"], false);
    assert_eq!(results[0]["duration"], 0);
    assert_eq!(
        results[0]["error"]["message"],
        "fixture refused to start"
    );
}

#[test]
fn filter_matching_nothing_yields_test_error_only() {
    let (messages, code) = run_child("selftest/arith.tp", &["--filter", "no-such-case"]);

    assert_eq!(code, 0);
    assert_eq!(kinds(&messages), ["test_error"]);
}

#[test]
fn filter_selects_matching_subset() {
    let (messages, code) = run_child("selftest/arith.tp", &["--filter", "integers"]);

    assert_eq!(code, 0);
    let results = results(&messages);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["testCase"]["title"], "adds integers");
}

#[test]
fn run_two_passing_files_concurrently() {
    let output = Command::new(bin())
        .args([
            "run",
            "selftest/arith.tp",
            "selftest/fixtures.tp",
            "--max-children",
            "2",
            "--no-color",
        ])
        .output()
        .expect("failed to spawn orchestrator");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Running 2 test file(s), up to 2 workers"));
    assert!(stdout.contains("Total: 6 | Pass: 6 | Fail: 0"));
}

#[test]
fn failing_file_fails_the_run() {
    let output = Command::new(bin())
        .args(["run", "selftest/failing.tp", "--no-color"])
        .output()
        .expect("failed to spawn orchestrator");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("✗ FAIL"));
}

#[test]
fn json_format_reemits_the_protocol() {
    let output = Command::new(bin())
        .args(["run", "selftest/arith.tp", "--format", "json"])
        .output()
        .expect("failed to spawn orchestrator");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let messages: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("non-JSON line in json format"))
        .collect();

    // The orchestrator's own announcement carries the pool size.
    assert_eq!(messages[0]["kind"], "run_start");
    assert!(messages[0]["maxChildCount"].is_u64());

    assert_eq!(results(&messages).len(), 3);
    assert_eq!(messages.last().unwrap()["kind"], "run_complete");
}

#[test]
fn unregistered_file_fails_with_test_error() {
    let (messages, code) = run_child("no/such/file.tp", &[]);

    assert_eq!(code, 1);
    assert_eq!(kinds(&messages), ["test_error"]);
    let error = messages[0]["error"].as_str().unwrap();
    assert!(error.contains("no/such/file.tp"));
}

#[test]
fn list_shows_registered_files() {
    let output = Command::new(bin())
        .args(["list", "--detailed"])
        .output()
        .expect("failed to spawn list");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("selftest/arith.tp"));
    assert!(stdout.contains("adds integers"));
    assert!(stdout.contains("build/selftest/arith.out"));
}
