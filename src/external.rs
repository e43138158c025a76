//! Resolution and launching of external commands.
//!
//! The resolver probes the session search path; the launcher spawns the
//! resolved program and either blocks on it (sequential mode) or registers
//! it with the job table and hands it to the reaper (parallel mode).

use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::paths::SearchPath;
use crate::state::{Mode, Session};
use anyhow::Result;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// A command that is not a builtin.
pub struct ExternalCommand {
    path: PathBuf,
    args: Vec<String>,
    /// The command as typed, kept for the job table.
    display: String,
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let path = resolve_command(name, &session.search_path)?;
        let mut display = name.to_owned();
        for arg in args {
            display.push(' ');
            display.push_str(arg);
        }
        Some(Box::new(ExternalCommand {
            path,
            args: args.iter().map(|s| (*s).to_owned()).collect(),
            display,
        }))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let mut cmd = Command::new(&self.path);
        cmd.args(&self.args)
            .envs(session.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&session.env.current_dir);

        // Spawn failures surface here, in the parent: a child that cannot
        // exec never runs any shell logic and cannot touch session state.
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                log::warn!("exec of {} failed: {err}", self.path.display());
                writeln!(stdout, "Command {} failed to run.", self.path.display())?;
                return Ok(127);
            }
            Err(err) => {
                log::error!("spawn of {} failed: {err}", self.path.display());
                writeln!(stdout, "Failed to start process.")?;
                return Ok(1);
            }
        };

        match session.state.mode {
            Mode::Sequential => {
                // wait for this child specifically, not wait-any: a
                // leftover parallel job must not satisfy this wait
                let status = child.wait()?;
                log::debug!("{} exited: {status}", self.display);
                Ok(exit_code(status))
            }
            Mode::Parallel => {
                let pid = child.id() as i32;
                session.jobs.lock().append(pid, self.display.clone());
                session.reaper.watch(child, self.display);
                log::debug!("registered pid {pid} for parallel completion");
                Ok(0)
            }
        }
    }
}

/// Resolve a command name against the search path.
///
/// A leading `/` bypasses the search entirely and is returned verbatim;
/// validity is discovered at spawn time. Anything else probes
/// `directory/name` for each search directory in order and returns the
/// first that exists (existence, not executability).
pub fn resolve_command(name: &str, search_path: &SearchPath) -> Option<PathBuf> {
    if name.starts_with('/') {
        return Some(PathBuf::from(name));
    }
    search_path
        .list()
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| candidate.exists())
}

pub(crate) fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&status) {
        128 + signal
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> ExitCode {
    -1
}
