//! Reporter contract and built-in reporters
//!
//! Reporters consume the orchestrator's event callbacks and write to an
//! output sink they own. Internal state accumulates within one run and
//! is reset at the start of each watch iteration.

use std::io::Write;
use std::time::Instant;

use tracing::debug;

use crate::build::BuildStats;
use crate::models::{CaseReport, TestCaseRef};
use crate::protocol::{self, Message};

/// Callback contract invoked by the orchestrator for every protocol
/// event. Default impls make most callbacks optional.
pub trait Reporter: Send {
    /// Clear accumulated state before a fresh watch iteration.
    fn reset(&mut self) {}

    fn on_compile_start(&mut self) {}

    fn on_compile_end(&mut self, _stats: &BuildStats) {}

    /// Called once by the orchestrator (with `max_child_count` set) to
    /// announce the run, and once per worker (without it) carrying that
    /// file's test count.
    fn on_run_start(&mut self, num_files: usize, max_child_count: Option<usize>);

    fn on_test_start(&mut self, test_case: &TestCaseRef);

    fn on_test_result(&mut self, report: &CaseReport);

    fn on_run_complete(&mut self);

    fn on_error(&mut self, reason: &str);

    /// Raw (non-protocol) worker output, passed through verbatim.
    fn on_output(&mut self, _line: &str) {}
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn reset(&mut self) {
        (**self).reset();
    }
    fn on_compile_start(&mut self) {
        (**self).on_compile_start();
    }
    fn on_compile_end(&mut self, stats: &BuildStats) {
        (**self).on_compile_end(stats);
    }
    fn on_run_start(&mut self, num_files: usize, max_child_count: Option<usize>) {
        (**self).on_run_start(num_files, max_child_count);
    }
    fn on_test_start(&mut self, test_case: &TestCaseRef) {
        (**self).on_test_start(test_case);
    }
    fn on_test_result(&mut self, report: &CaseReport) {
        (**self).on_test_result(report);
    }
    fn on_run_complete(&mut self) {
        (**self).on_run_complete();
    }
    fn on_error(&mut self, reason: &str) {
        (**self).on_error(reason);
    }
    fn on_output(&mut self, line: &str) {
        (**self).on_output(line);
    }
}

/// Streams one line per test and a boxed summary at the end.
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
    colorize: bool,
    announced: bool,
    expected: usize,
    passed: usize,
    failed: usize,
    errors: usize,
    started: Option<Instant>,
}

impl ConsoleReporter {
    pub fn new(colorize: bool) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), colorize)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, colorize: bool) -> Self {
        Self {
            out,
            colorize,
            announced: false,
            expected: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            started: None,
        }
    }

    fn status_str(&self, passed: bool) -> &'static str {
        match (self.colorize, passed) {
            (true, true) => "\x1b[32m✓ PASS\x1b[0m",
            (true, false) => "\x1b[31m✗ FAIL\x1b[0m",
            (false, true) => "✓ PASS",
            (false, false) => "✗ FAIL",
        }
    }
}

impl Reporter for ConsoleReporter {
    fn reset(&mut self) {
        self.announced = false;
        self.expected = 0;
        self.passed = 0;
        self.failed = 0;
        self.errors = 0;
        self.started = None;
    }

    fn on_compile_start(&mut self) {
        let _ = writeln!(self.out, "Preparing build artifacts...");
    }

    fn on_compile_end(&mut self, stats: &BuildStats) {
        let _ = writeln!(
            self.out,
            "Artifacts ready: {} file(s) [{}ms]",
            stats.num_artifacts(),
            stats.duration_ms
        );
    }

    fn on_run_start(&mut self, num_files: usize, max_child_count: Option<usize>) {
        match max_child_count {
            Some(max) if !self.announced => {
                self.announced = true;
                self.started = Some(Instant::now());
                let _ = writeln!(
                    self.out,
                    "\nRunning {num_files} test file(s), up to {max} workers"
                );
                let _ = writeln!(
                    self.out,
                    "──────────────────────────────────────────────────────────────"
                );
            }
            _ => self.expected += num_files,
        }
    }

    fn on_test_start(&mut self, test_case: &TestCaseRef) {
        debug!(test = %test_case, "test started");
    }

    fn on_test_result(&mut self, report: &CaseReport) {
        if report.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }

        let _ = writeln!(
            self.out,
            "{} {:30} {:20} [{:>5}ms]",
            self.status_str(report.passed),
            report.test_case.title,
            report.test_case.file_name,
            report.duration_ms
        );
        if let Some(error) = &report.error {
            let _ = writeln!(self.out, "       └─ {}: {}", error.name, error.message);
            if let Some(stack) = &error.stack {
                for line in stack.lines() {
                    let _ = writeln!(self.out, "          {line}");
                }
            }
        }
    }

    fn on_run_complete(&mut self) {
        let elapsed_ms = self
            .started
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let total = self.passed + self.failed;
        let pass_rate = if total > 0 {
            (self.passed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let fail_str = if self.colorize && self.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", self.failed)
        } else {
            self.failed.to_string()
        };

        let _ = writeln!(
            self.out,
            "──────────────────────────────────────────────────────────────"
        );
        let _ = writeln!(
            self.out,
            "Total: {} | Pass: {} | Fail: {} | Errors: {}",
            total, self.passed, fail_str, self.errors
        );
        let _ = writeln!(
            self.out,
            "Pass Rate: {pass_rate:.1}% | Duration: {elapsed_ms}ms"
        );
        if total < self.expected {
            // Workers that died mid-file leave announced cases unreported.
            let _ = writeln!(
                self.out,
                "Warning: {} announced test(s) produced no result",
                self.expected - total
            );
        }
        let _ = self.out.flush();
    }

    fn on_error(&mut self, reason: &str) {
        self.errors += 1;
        let error_str = if self.colorize {
            "\x1b[33m! ERROR\x1b[0m"
        } else {
            "! ERROR"
        };
        let _ = writeln!(self.out, "{error_str} {reason}");
    }

    fn on_output(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }
}

/// Re-emits every event in the wire format, one JSON document per line,
/// for machine consumption.
pub struct JsonReporter {
    out: Box<dyn Write + Send>,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    fn emit(&mut self, message: &Message) {
        if let Ok(line) = protocol::encode_line(message) {
            let _ = writeln!(self.out, "{line}");
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for JsonReporter {
    fn on_run_start(&mut self, num_files: usize, max_child_count: Option<usize>) {
        self.emit(&Message::RunStart {
            num_files,
            max_child_count,
        });
    }

    fn on_test_start(&mut self, test_case: &TestCaseRef) {
        self.emit(&Message::TestStart(test_case.clone()));
    }

    fn on_test_result(&mut self, report: &CaseReport) {
        self.emit(&Message::TestResult(report.clone()));
    }

    fn on_run_complete(&mut self) {
        self.emit(&Message::RunComplete);
        let _ = self.out.flush();
    }

    fn on_error(&mut self, reason: &str) {
        self.emit(&Message::TestError {
            error: reason.to_string(),
        });
    }
}

/// Test double capturing every callback.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingReporter {
    pub run_starts: Vec<(usize, Option<usize>)>,
    pub test_starts: Vec<String>,
    pub results: Vec<CaseReport>,
    pub errors: Vec<String>,
    pub run_completes: usize,
    pub resets: usize,
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn on_run_start(&mut self, num_files: usize, max_child_count: Option<usize>) {
        self.run_starts.push((num_files, max_child_count));
    }

    fn on_test_start(&mut self, test_case: &TestCaseRef) {
        self.test_starts.push(test_case.title.clone());
    }

    fn on_test_result(&mut self, report: &CaseReport) {
        self.results.push(report.clone());
    }

    fn on_run_complete(&mut self) {
        self.run_completes += 1;
    }

    fn on_error(&mut self, reason: &str) {
        self.errors.push(reason.to_string());
    }
}
