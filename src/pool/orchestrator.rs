//! Worker-pool orchestrator
//!
//! Runs in the coordinating process: spawns one worker process per test
//! file up to the configured concurrency, relays each worker's protocol
//! messages to the reporter, backfills freed slots, and decides the
//! final exit code. The coordinating loop is single-threaded and
//! event-driven; it reacts only to "message received" and "process
//! exited" events.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::CompilerService;
use crate::models::RunStats;
use crate::output::Reporter;
use crate::pool::{PoolAction, PoolConfig, PoolState};
use crate::protocol::{self, Message};

/// Inputs for one orchestrator instance.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Discovered test files, in dispatch order.
    pub files: Vec<PathBuf>,
    pub max_children: usize,
    /// Abort the whole run on the first nonzero worker exit. Forced off
    /// in watch mode so a failing run does not end the watch loop.
    pub fail_fast: bool,
    pub artifact_dir: PathBuf,
    pub filter: Option<String>,
}

/// One event on the single consumer loop, from any worker.
#[derive(Debug)]
enum PoolEvent {
    Message { ident: u32, message: Message },
    /// Worker stdout that is not protocol traffic; passed through.
    Raw { line: String },
    Exited { ident: u32, code: i32 },
}

/// The coordinating process's scheduler and aggregator.
pub struct Orchestrator<R: Reporter> {
    config: OrchestratorConfig,
    stats: RunStats,
    reporter: R,
}

impl<R: Reporter> Orchestrator<R> {
    pub fn new(config: OrchestratorConfig, reporter: R) -> Self {
        let stats = RunStats::new(config.files.len());
        Self {
            config,
            stats,
            reporter,
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Build once, then run a single dispatch cycle. Returns the process
    /// exit code: 0 iff every worker exited 0, else the first nonzero
    /// worker code. A compile failure aborts with exit 1 before any
    /// worker is spawned.
    pub async fn run<C: CompilerService>(&mut self, compiler: &mut C) -> Result<i32> {
        self.reporter.on_compile_start();
        match compiler.build().await {
            Ok(stats) => self.reporter.on_compile_end(&stats),
            Err(err) => {
                self.reporter.on_error(&format!("compile failed: {err:#}"));
                return Ok(1);
            }
        }

        self.run_cycle().await
    }

    /// Re-run the full dispatch cycle on every recompilation signal.
    /// Fail-fast is disabled for every cycle; a failed rebuild re-arms
    /// watching without running tests.
    pub async fn run_watch<C: CompilerService>(&mut self, compiler: &mut C) -> Result<i32> {
        self.config.fail_fast = false;

        let mut code = self.run(compiler).await?;
        while let Some(outcome) = compiler.next_rebuild().await {
            match outcome {
                Ok(stats) => {
                    self.reporter.reset();
                    self.stats.reset();
                    self.reporter.on_compile_end(&stats);
                    code = self.run_cycle().await?;
                }
                Err(err) => {
                    self.reporter.on_error(&format!("compile failed: {err:#}"));
                }
            }
        }
        Ok(code)
    }

    async fn run_cycle(&mut self) -> Result<i32> {
        let total = self.config.files.len();
        info!(
            files = total,
            max_children = self.config.max_children,
            "starting dispatch cycle"
        );
        self.reporter
            .on_run_start(total, Some(self.config.max_children));

        let pool_config = PoolConfig {
            max_children: self.config.max_children,
            fail_fast: self.config.fail_fast,
        };
        let mut state = PoolState::new(self.config.files.clone(), pool_config);
        let (tx, mut rx) = mpsc::channel::<PoolEvent>(64);
        // The local sender only exists to seed reader-task clones; it is
        // released as soon as the queue drains so the channel closes once
        // the last reader task is gone.
        let mut tx = Some(tx);

        for action in state.saturate() {
            if let Some(code) = self.apply(action, &tx)? {
                return Ok(code);
            }
        }
        if !state.has_pending() {
            tx = None;
        }

        while let Some(event) = rx.recv().await {
            match event {
                PoolEvent::Message { ident, message } => self.handle_message(ident, message),
                PoolEvent::Raw { line } => self.reporter.on_output(&line),
                PoolEvent::Exited { ident, code } => {
                    debug!(ident, code, "worker exited");
                    for action in state.worker_exited(code) {
                        if let Some(code) = self.apply(action, &tx)? {
                            return Ok(code);
                        }
                    }
                    if !state.has_pending() {
                        tx = None;
                    }
                }
            }
        }

        // Reachable only if a reader task died without delivering its
        // worker's exit event.
        warn!("event channel closed before completion");
        Ok(state.exit_code())
    }

    /// Interpret one scheduling action. Returns the final exit code when
    /// the cycle is over.
    fn apply(
        &mut self,
        action: PoolAction,
        tx: &Option<mpsc::Sender<PoolEvent>>,
    ) -> Result<Option<i32>> {
        match action {
            PoolAction::Spawn { file, ident } => {
                let tx = tx
                    .as_ref()
                    .context("dispatch requested after the queue drained")?;
                self.spawn_worker(file, ident, tx.clone())?;
                Ok(None)
            }
            PoolAction::Complete { exit_code } => {
                self.reporter.on_run_complete();
                info!(exit_code, stats = %self.stats, "run complete");
                Ok(Some(exit_code))
            }
            PoolAction::Abort { exit_code } => {
                // Fail-fast: finalize immediately. Still-running workers
                // are neither awaited nor killed.
                self.reporter.on_run_complete();
                info!(exit_code, "run aborted on first failing worker");
                Ok(Some(exit_code))
            }
        }
    }

    /// Forward one worker message to the reporter, mirroring the message
    /// kinds onto the reporter contract.
    fn handle_message(&mut self, ident: u32, message: Message) {
        match message {
            Message::RunStart {
                num_files,
                max_child_count,
            } => self.reporter.on_run_start(num_files, max_child_count),
            Message::TestStart(test_case) => self.reporter.on_test_start(&test_case),
            Message::TestResult(report) => {
                self.stats.record(&report);
                self.reporter.on_test_result(&report);
            }
            Message::TestError { error } => self.reporter.on_error(&error),
            Message::RunComplete => {
                debug!(ident, "ignoring run_complete from worker");
            }
        }
    }

    /// Spawn one worker process for `file` and wire its stdout and exit
    /// status into the event channel.
    fn spawn_worker(&self, file: PathBuf, ident: u32, tx: mpsc::Sender<PoolEvent>) -> Result<()> {
        let exe = std::env::current_exe().context("failed to locate the runner executable")?;

        let mut command = Command::new(exe);
        command
            .arg("child")
            .arg("--file")
            .arg(&file)
            .arg("--artifact-dir")
            .arg(&self.config.artifact_dir)
            .arg("--ident")
            .arg(ident.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(filter) = &self.config.filter {
            command.arg("--filter").arg(filter);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn worker for {}", file.display()))?;
        let stdout = child
            .stdout
            .take()
            .context("worker stdout was not captured")?;
        info!(ident, file = %file.display(), "spawned worker");

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let event = match protocol::decode_line(&line) {
                    Ok(message) => PoolEvent::Message { ident, message },
                    Err(_) => PoolEvent::Raw { line },
                };
                if tx.send(event).await.is_err() {
                    // Consumer finalized (fail-fast); stop relaying.
                    return;
                }
            }

            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(1),
                Err(err) => {
                    warn!(ident, "failed to reap worker: {err}");
                    1
                }
            };
            let _ = tx.send(PoolEvent::Exited { ident, code }).await;
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildStats;
    use crate::models::{CaseReport, SerializedError, TestCaseRef};
    use crate::output::RecordingReporter;
    use std::collections::VecDeque;

    /// Compiler double replaying a fixed sequence of rebuild outcomes.
    struct ScriptedCompiler {
        rebuilds: VecDeque<Result<BuildStats>>,
    }

    impl CompilerService for ScriptedCompiler {
        async fn build(&mut self) -> Result<BuildStats> {
            Ok(BuildStats::default())
        }

        async fn next_rebuild(&mut self) -> Option<Result<BuildStats>> {
            self.rebuilds.pop_front()
        }
    }

    fn orchestrator(files: usize) -> Orchestrator<RecordingReporter> {
        let config = OrchestratorConfig {
            files: (0..files).map(|i| PathBuf::from(format!("f{i}.tp"))).collect(),
            max_children: 2,
            fail_fast: true,
            artifact_dir: PathBuf::from("build"),
            filter: None,
        };
        Orchestrator::new(config, RecordingReporter::default())
    }

    fn case_ref(title: &str) -> TestCaseRef {
        TestCaseRef {
            title: title.to_string(),
            file_name: "f0.tp".to_string(),
            index: 0,
        }
    }

    #[test]
    fn messages_map_onto_reporter_callbacks() {
        let mut orchestrator = orchestrator(1);

        orchestrator.handle_message(
            0,
            Message::RunStart {
                num_files: 2,
                max_child_count: None,
            },
        );
        orchestrator.handle_message(0, Message::TestStart(case_ref("ok")));
        orchestrator.handle_message(
            0,
            Message::TestResult(CaseReport::passed(case_ref("ok"), 3)),
        );
        orchestrator.handle_message(
            0,
            Message::TestError {
                error: "no tests found in f1.tp".to_string(),
            },
        );

        let reporter = orchestrator.into_reporter();
        assert_eq!(reporter.run_starts, vec![(2, None)]);
        assert_eq!(reporter.test_starts, vec!["ok"]);
        assert_eq!(reporter.results.len(), 1);
        assert_eq!(reporter.errors, vec!["no tests found in f1.tp"]);
    }

    #[test]
    fn stats_accumulate_from_result_messages() {
        let mut orchestrator = orchestrator(1);
        orchestrator.handle_message(
            0,
            Message::TestResult(CaseReport::passed(case_ref("a"), 5)),
        );
        orchestrator.handle_message(
            0,
            Message::TestResult(CaseReport::failed(
                case_ref("b"),
                SerializedError {
                    name: "Error".to_string(),
                    message: "nope".to_string(),
                    stack: None,
                    code: None,
                },
                2,
            )),
        );

        let stats = orchestrator.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 1);
        assert!(!stats.all_passed());
    }

    #[test]
    fn worker_run_complete_is_ignored() {
        let mut orchestrator = orchestrator(1);
        orchestrator.handle_message(0, Message::RunComplete);

        let reporter = orchestrator.into_reporter();
        assert_eq!(reporter.run_completes, 0);
    }

    #[tokio::test]
    async fn watch_mode_resets_and_reruns_per_rebuild() {
        let mut orchestrator = orchestrator(0);
        let mut compiler = ScriptedCompiler {
            rebuilds: VecDeque::from([
                Ok(BuildStats::default()),
                Err(anyhow::anyhow!("syntax error in module")),
                Ok(BuildStats::default()),
            ]),
        };

        let code = orchestrator.run_watch(&mut compiler).await.unwrap();

        assert_eq!(code, 0);
        assert!(!orchestrator.config.fail_fast);

        let reporter = orchestrator.into_reporter();
        // Initial run plus one per successful rebuild; the failed rebuild
        // re-arms watching without a dispatch cycle.
        assert_eq!(reporter.run_completes, 3);
        assert_eq!(reporter.resets, 2);
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].contains("syntax error in module"));
    }

    #[tokio::test]
    async fn empty_file_list_completes_with_zero() {
        let mut orchestrator = orchestrator(0);
        let code = orchestrator.run_cycle().await.unwrap();

        assert_eq!(code, 0);
        let reporter = orchestrator.into_reporter();
        assert_eq!(reporter.run_completes, 1);
        // The orchestrator's own announcement carries the pool size.
        assert_eq!(reporter.run_starts, vec![(0, Some(2))]);
    }
}
