use crate::builtin::{Cd, Exit, HostDelegate, Jobs, Mode, Pause, Resume};
use crate::command::{CommandFactory, ExitCode};
use crate::external::ExternalCommand;
use crate::lexer;
use crate::reaper::PrinterNotify;
use crate::state::Session;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Retry cadence when end-of-input arrives while jobs are still live.
/// A latency/CPU tradeoff, not a correctness mechanism.
const EOF_RETRY: Duration = Duration::from_millis(200);

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate — builtins, the host
/// delegate, and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The line-oriented command interpreter.
///
/// Owns the [`Session`] and a list of [`CommandFactory`] objects queried
/// in order to create commands by name; the first factory that recognizes
/// the name wins, so builtins shadow external programs.
///
/// Example
/// ```no_run
/// use jobshell::{Interpreter, SearchPath, Session};
/// let session = Session::new(SearchPath::from_entries(vec!["/bin".into()]));
/// let mut sh = Interpreter::new(session);
/// sh.repl().unwrap();
/// ```
pub struct Interpreter {
    session: Session,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with the default command set:
    /// `cd`, `jobs`, `mode`, `pause`, `resume`, `exit`, the host-delegate
    /// fallback, and the external command launcher.
    pub fn new(session: Session) -> Self {
        Self::with_factories(
            session,
            vec![
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Jobs>::default()),
                Box::new(Factory::<Mode>::default()),
                Box::new(Factory::<Pause>::default()),
                Box::new(Factory::<Resume>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<HostDelegate>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }

    /// Create an interpreter with a custom set of command factories.
    pub fn with_factories(session: Session, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { session, commands }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a single command invocation by name with arguments.
    pub fn run(&mut self, name: &str, args: &[&str], stdout: &mut dyn Write) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.session, name, args) {
                return cmd.execute(stdout, &mut self.session);
            }
        }
        writeln!(stdout, "Invalid command: {name}")?;
        Ok(127)
    }

    /// Execute one raw input line: strip the comment, split on `;`, and
    /// run each command under the mode snapshot taken at the start of the
    /// line. A `mode` change mid-line only affects the next line.
    pub fn run_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<()> {
        self.session.state.refresh_mode();
        for command in lexer::split_commands(line) {
            let words = lexer::split_words(command);
            let Some((name, args)) = words.split_first() else {
                continue;
            };
            match self.run(name, args, stdout) {
                Ok(0) => {}
                Ok(code) => log::debug!("{name} finished with code {code}"),
                Err(err) => writeln!(stdout, "{err}")?,
            }
        }
        stdout.flush()?;
        Ok(())
    }

    /// The interactive read-eval loop.
    ///
    /// Terminates when `exit` is accepted, or at end-of-input with an
    /// empty job table. End-of-input with live jobs keeps the loop
    /// running until they drain or more input arrives.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let printer = rl.create_external_printer()?;
        self.session.reaper.set_notifier(PrinterNotify(printer));
        set_window_title("jobshell")?;

        loop {
            let prompt = format!("{}> ", self.session.env.current_dir.display());
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    self.run_line(&line, &mut out)?;
                    if self.session.state.do_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    if self.session.job_count() > 0 {
                        println!("You cannot exit while there are processes running.");
                        thread::sleep(EOF_RETRY);
                    } else {
                        break;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

fn set_window_title(title: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "\x1b]0;{title}\x07")?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobState;
    use crate::paths::SearchPath;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::time::Instant;

    fn interp() -> Interpreter {
        let mut session = Session::new(SearchPath::from_entries(vec![
            "/bin".into(),
            "/usr/bin".into(),
        ]));
        // pin the working directory so concurrent cd tests can't strand
        // spawned children in a deleted one
        session.env.current_dir = std::env::temp_dir();
        Interpreter::new(session)
    }

    fn run_line(sh: &mut Interpreter, line: &str) -> String {
        let mut out = Vec::new();
        sh.run_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn kill_all_jobs(sh: &Interpreter) {
        for job in sh.session().jobs.lock().list() {
            let _ = kill(Pid::from_raw(job.pid), Signal::SIGKILL);
        }
    }

    fn wait_for_drain(sh: &Interpreter) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sh.session().job_count() > 0 {
            assert!(Instant::now() < deadline, "job table did not drain");
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn parallel_launches_register_every_command_on_the_line() {
        let mut sh = interp();
        run_line(&mut sh, "mode parallel");
        run_line(&mut sh, "sleep 5;sleep 5");

        {
            let table = sh.session().jobs.lock();
            assert_eq!(table.count(), 2);
            assert!(table.list().iter().all(|j| j.state == JobState::Running));
        }

        kill_all_jobs(&sh);
        wait_for_drain(&sh);
    }

    #[test]
    fn sequential_launches_block_until_the_child_exits() {
        let mut sh = interp();
        let started = Instant::now();
        run_line(&mut sh, "sleep 0.3");
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(sh.session().job_count(), 0);
    }

    #[test]
    fn mode_change_takes_effect_on_the_next_line_only() {
        let mut sh = interp();
        let started = Instant::now();
        // same line: still runs under the sequential snapshot
        run_line(&mut sh, "mode parallel;sleep 0.3");
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(sh.session().job_count(), 0);

        // next line: parallel
        let started = Instant::now();
        run_line(&mut sh, "sleep 5");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(sh.session().job_count(), 1);

        kill_all_jobs(&sh);
        wait_for_drain(&sh);
    }

    #[test]
    fn finished_parallel_jobs_are_reaped_from_the_table() {
        let mut sh = interp();
        run_line(&mut sh, "mode parallel");
        run_line(&mut sh, "sleep 0.1");
        assert_eq!(sh.session().job_count(), 1);
        wait_for_drain(&sh);
    }

    #[test]
    fn unknown_commands_spawn_nothing() {
        let mut sh = interp();
        let out = run_line(&mut sh, "no-such-command-zz");
        assert_eq!(out, "Invalid command: no-such-command-zz\n");
        assert_eq!(sh.session().job_count(), 0);
    }

    #[test]
    fn pause_and_resume_round_trip_through_the_table() {
        let mut sh = interp();
        run_line(&mut sh, "mode parallel");
        run_line(&mut sh, "sleep 5");
        let pid = sh.session().jobs.lock().list()[0].pid;

        let out = run_line(&mut sh, &format!("pause {pid}"));
        assert_eq!(out, "Job paused.\n");
        assert_eq!(sh.session().jobs.lock().get(pid).unwrap().state, JobState::Paused);

        let out = run_line(&mut sh, &format!("resume {pid}"));
        assert_eq!(out, "Job resumed.\n");
        assert_eq!(sh.session().jobs.lock().get(pid).unwrap().state, JobState::Running);

        kill_all_jobs(&sh);
        wait_for_drain(&sh);
    }

    #[test]
    fn exit_is_refused_while_a_job_is_live() {
        let mut sh = interp();
        run_line(&mut sh, "mode parallel");
        run_line(&mut sh, "sleep 5");

        let out = run_line(&mut sh, "exit");
        assert!(out.contains("You cannot exit while there are processes running."));
        assert!(!sh.session().state.do_exit);

        kill_all_jobs(&sh);
        wait_for_drain(&sh);
        run_line(&mut sh, "exit");
        assert!(sh.session().state.do_exit);
    }

    #[test]
    fn comments_hide_the_rest_of_the_line() {
        let mut sh = interp();
        let out = run_line(&mut sh, "# nothing to see ; jobs");
        assert!(out.is_empty());
    }
}
