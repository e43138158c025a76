//! Session-wide state: the execution mode, the exit latch, and the bundle
//! of everything a command needs to run.

use crate::env::Environment;
use crate::jobs::{self, SharedJobTable};
use crate::paths::SearchPath;
use crate::reaper::Reaper;
use std::fmt;

/// Execution discipline for launching external commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Block on each launched command before reading the next.
    Sequential,
    /// Launch without waiting; completion is observed by the reaper.
    Parallel,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sequential => write!(f, "sequential"),
            Mode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Mode and termination state for one interpreter session.
///
/// `in_parallel` is the authoritative, user-settable flag; `mode` is the
/// per-line snapshot derived from it. The `mode` builtin flips the flag
/// mid-line, but launches keep using the snapshot until the next line.
#[derive(Debug)]
pub struct ModeState {
    pub in_parallel: bool,
    pub mode: Mode,
    /// Latched once an exit is requested while the job table is empty.
    /// Never reset.
    pub do_exit: bool,
}

impl ModeState {
    pub fn new() -> Self {
        Self {
            in_parallel: false,
            mode: Mode::Sequential,
            do_exit: false,
        }
    }

    /// Recompute the effective mode from `in_parallel`. Called once per
    /// input line, before any command on the line executes.
    pub fn refresh_mode(&mut self) {
        self.mode = if self.in_parallel {
            Mode::Parallel
        } else {
            Mode::Sequential
        };
    }

    /// Latch the exit flag, permitted only while no jobs are live.
    /// Returns whether the request was accepted.
    pub fn request_exit(&mut self, live_jobs: usize) -> bool {
        if live_jobs == 0 {
            self.do_exit = true;
        }
        self.do_exit
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one interpreter session owns: environment, search path,
/// mode state, the shared job table, and the reaper that drains it.
pub struct Session {
    pub env: Environment,
    pub search_path: SearchPath,
    pub state: ModeState,
    pub jobs: SharedJobTable,
    pub reaper: Reaper,
}

impl Session {
    pub fn new(search_path: SearchPath) -> Self {
        let jobs = jobs::shared_table();
        let reaper = Reaper::new(jobs.clone());
        Self {
            env: Environment::new(),
            search_path,
            state: ModeState::new(),
            jobs,
            reaper,
        }
    }

    /// Current number of live jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.lock().count()
    }
}
