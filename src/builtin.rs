use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::jobs::JobState;
use crate::state::Session;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "jobs".
    fn name() -> &'static str;

    /// Executes the command against the session.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero
    /// for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => {
                if let Some(home) = session.env.get_var("HOME") {
                    PathBuf::from(home)
                } else {
                    return Err(anyhow::anyhow!("cd: no target and HOME not set"));
                }
            }
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            session.env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        session.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the tracked jobs, oldest first.
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let table = session.jobs.lock();
        for job in table.list() {
            writeln!(stdout, "[{}]: {} - STATUS: {}", job.pid, job.name, job.state)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Query or set the execution discipline used for subsequent input lines.
pub struct Mode {
    #[argh(positional)]
    /// mode: "parallel" (or "p"), "sequential" (or "s"); omit to report the current mode.
    pub requested: Option<String>,
}

impl BuiltinCommand for Mode {
    fn name() -> &'static str {
        "mode"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        match self.requested.as_deref() {
            // reports the snapshot in effect for this line, not the
            // pending flag
            None => writeln!(stdout, "Running in {} mode.", session.state.mode)?,
            Some("parallel" | "p") => session.state.in_parallel = true,
            Some("sequential" | "s") => session.state.in_parallel = false,
            Some(other) => {
                writeln!(stdout, "Unrecognised mode: {other}.")?;
                writeln!(stdout, "Valid entries are parallel or p, or sequential or s.")?;
                return Ok(1);
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Stop a tracked job with SIGSTOP.
pub struct Pause {
    #[argh(positional)]
    /// process id of the job to stop.
    pub pid: i32,
}

impl BuiltinCommand for Pause {
    fn name() -> &'static str {
        "pause"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        signal_job(
            self.pid,
            Signal::SIGSTOP,
            JobState::Paused,
            "Job paused.",
            stdout,
            session,
        )
    }
}

#[derive(FromArgs)]
/// Continue a paused job with SIGCONT.
pub struct Resume {
    #[argh(positional)]
    /// process id of the job to continue.
    pub pid: i32,
}

impl BuiltinCommand for Resume {
    fn name() -> &'static str {
        "resume"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        signal_job(
            self.pid,
            Signal::SIGCONT,
            JobState::Running,
            "Job resumed.",
            stdout,
            session,
        )
    }
}

/// Common path for `pause` and `resume`: validate the pid, check the job
/// is actually ours, send the control signal, then record the transition.
///
/// The table lookup happens before the signal is sent so an unknown pid
/// never stops an unrelated OS process.
fn signal_job(
    pid: i32,
    signal: Signal,
    new_state: JobState,
    done_msg: &str,
    stdout: &mut dyn Write,
    session: &mut Session,
) -> Result<ExitCode> {
    if pid <= 0 {
        writeln!(stdout, "Invalid process id.")?;
        return Ok(1);
    }

    let mut table = session.jobs.lock();
    if table.get(pid).is_none() {
        writeln!(stdout, "Could not find the job with id: {pid}.")?;
        return Ok(1);
    }
    if let Err(err) = kill(Pid::from_raw(pid), signal) {
        log::warn!("sending {signal} to pid {pid} failed: {err}");
        writeln!(stdout, "Could not signal process {pid}: {err}.")?;
        return Ok(1);
    }
    // the entry was just looked up under this lock, so this cannot miss
    let _ = table.set_state(pid, new_state);
    writeln!(stdout, "{done_msg}")?;
    Ok(0)
}

#[derive(FromArgs)]
/// Request shell termination. Refused while jobs are still running.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let live = session.job_count();
        if session.state.request_exit(live) {
            Ok(0)
        } else {
            writeln!(stdout, "You cannot exit while there are processes running.")?;
            Ok(1)
        }
    }
}

/// Command names recognized by the shell but handed to the host
/// interpreter instead of being implemented here.
const DELEGATED: &[&str] = &["pwd", "echo", "type", "help"];

/// Fallback that runs a recognized-but-unimplemented builtin through
/// `/bin/sh -c`. In parallel mode the line is backgrounded with `&` and
/// left untracked; the host shell reaps it on its own.
pub struct HostDelegate {
    line: String,
}

impl CommandFactory for Factory<HostDelegate> {
    fn try_create(
        &self,
        _session: &Session,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if !DELEGATED.contains(&name) {
            return None;
        }
        let mut line = name.to_owned();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        Some(Box::new(HostDelegate { line }))
    }
}

impl ExecutableCommand for HostDelegate {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        session: &mut Session,
    ) -> Result<ExitCode> {
        let line = match session.state.mode {
            crate::state::Mode::Parallel => format!("{} &", self.line),
            crate::state::Mode::Sequential => self.line,
        };
        log::debug!("delegating to host interpreter: {line}");
        let status = Command::new("/bin/sh")
            .arg("-c")
            .arg(&line)
            .envs(session.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&session.env.current_dir)
            .status();
        match status {
            Ok(status) => Ok(crate::external::exit_code(status)),
            Err(err) => {
                log::error!("host interpreter failed: {err}");
                writeln!(stdout, "Failed to start process.")?;
                Ok(1)
            }
        }
    }
}
