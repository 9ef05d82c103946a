//! Pool scheduling state machine
//!
//! A bounded work queue with eager refill, modeled as an explicit state
//! struct with a single mutation entry point per event so scheduling
//! can be tested without a real process tree. The number of live
//! workers never exceeds the configured maximum.

use std::collections::VecDeque;
use std::path::PathBuf;

/// Scheduling policy for one dispatch cycle.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    pub max_children: usize,
    /// Whether a worker's nonzero exit aborts the whole run immediately.
    pub fail_fast: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_children: 4,
            fail_fast: true,
        }
    }
}

/// What the interpreter must do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolAction {
    /// Spawn a worker for `file` under the given identity.
    Spawn { file: PathBuf, ident: u32 },
    /// All files done; finalize with this exit code.
    Complete { exit_code: i32 },
    /// Fail-fast abort: finalize now with the failing worker's code,
    /// without waiting for still-running siblings.
    Abort { exit_code: i32 },
}

/// Scheduler state for one dispatch cycle.
#[derive(Debug)]
pub struct PoolState {
    pending: VecDeque<PathBuf>,
    total_files: usize,
    running: usize,
    files_done: usize,
    next_ident: u32,
    first_failure: Option<i32>,
    finalized: bool,
    config: PoolConfig,
}

impl PoolState {
    pub fn new(files: Vec<PathBuf>, config: PoolConfig) -> Self {
        let total_files = files.len();
        Self {
            pending: files.into(),
            total_files,
            running: 0,
            files_done: 0,
            next_ident: 0,
            first_failure: None,
            finalized: false,
            config,
        }
    }

    pub fn running(&self) -> usize {
        self.running
    }

    pub fn files_done(&self) -> usize {
        self.files_done
    }

    /// Whether any file is still queued for dispatch. Once this turns
    /// false no further `Spawn` action can ever be produced.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        self.first_failure.unwrap_or(0)
    }

    /// Dispatch one file if a slot and work are both available. Yields
    /// `Complete` exactly once, when the queue drained and the last
    /// worker exited.
    fn dispatch_next(&mut self) -> Option<PoolAction> {
        if self.running == 0 && self.files_done == self.total_files {
            if self.finalized {
                return None;
            }
            self.finalized = true;
            return Some(PoolAction::Complete {
                exit_code: self.exit_code(),
            });
        }

        if self.running >= self.config.max_children {
            return None;
        }

        let file = self.pending.pop_front()?;
        let ident = self.next_ident;
        self.next_ident += 1;
        self.running += 1;
        Some(PoolAction::Spawn { file, ident })
    }

    /// Dispatch until the pool is full or the queue is drained; used at
    /// startup to saturate the pool and after each exit to backfill.
    pub fn saturate(&mut self) -> Vec<PoolAction> {
        let mut actions = Vec::new();
        while let Some(action) = self.dispatch_next() {
            let done = !matches!(action, PoolAction::Spawn { .. });
            actions.push(action);
            if done {
                break;
            }
        }
        actions
    }

    /// Single entry point for worker-exit events.
    pub fn worker_exited(&mut self, code: i32) -> Vec<PoolAction> {
        if code != 0 {
            if self.config.fail_fast {
                self.finalized = true;
                return vec![PoolAction::Abort { exit_code: code }];
            }
            self.first_failure.get_or_insert(code);
        }

        self.running -= 1;
        self.files_done += 1;
        self.saturate()
    }
}
