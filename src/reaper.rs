//! Asynchronous harvesting of terminated children.
//!
//! Each parallel launch hands its [`Child`] to a dedicated waiter thread.
//! `Child::wait` returns only when the process actually terminates, so a
//! stopped (paused) child never looks finished. On termination the waiter
//! deletes the job table entry and pushes a notice through the session's
//! [`Notify`] sink, which repaints the prompt when the line editor is
//! active. No signal handler is installed anywhere; the table is the only
//! shared resource and it is mutex-protected.

use crate::jobs::{JobState, SharedJobTable};
use parking_lot::Mutex;
use std::process::Child;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Sink for asynchronous, user-facing notices.
pub trait Notify: Send {
    fn notify(&mut self, msg: String);
}

/// Fallback sink used outside an interactive line editor.
pub struct ConsoleNotify;

impl Notify for ConsoleNotify {
    fn notify(&mut self, msg: String) {
        println!("{msg}");
    }
}

/// Adapter for a `rustyline` external printer, which inserts the message
/// above the pending input line and redraws the prompt.
pub struct PrinterNotify<P>(pub P);

impl<P: rustyline::ExternalPrinter + Send> Notify for PrinterNotify<P> {
    fn notify(&mut self, msg: String) {
        if let Err(err) = self.0.print(msg) {
            log::warn!("failed to print termination notice: {err}");
        }
    }
}

/// Owns the waiter threads that observe child termination.
#[derive(Clone)]
pub struct Reaper {
    jobs: SharedJobTable,
    notifier: Arc<Mutex<Box<dyn Notify>>>,
}

impl Reaper {
    pub fn new(jobs: SharedJobTable) -> Self {
        Self {
            jobs,
            notifier: Arc::new(Mutex::new(Box::new(ConsoleNotify))),
        }
    }

    /// Replace the notice sink, e.g. with the line editor's printer once
    /// the interactive loop starts.
    pub fn set_notifier<N: Notify + 'static>(&self, notifier: N) {
        *self.notifier.lock() = Box::new(notifier);
    }

    /// Watch `child` until it terminates, then delete its table entry and
    /// announce the termination.
    ///
    /// Exactly one waiter exists per tracked child, so every termination
    /// removes exactly one entry and no notification is lost or doubled.
    /// The handle is returned for tests; the interpreter lets waiters
    /// detach.
    pub fn watch(&self, mut child: Child, name: String) -> JoinHandle<()> {
        let jobs = self.jobs.clone();
        let notifier = self.notifier.clone();
        thread::spawn(move || {
            let pid = child.id() as i32;
            match child.wait() {
                Ok(status) => {
                    {
                        let mut table = jobs.lock();
                        // transient marker; the entry is gone before the
                        // lock drops
                        let _ = table.set_state(pid, JobState::Dead);
                        table.remove_by_pid(pid);
                    }
                    log::debug!("reaped pid {pid} ({name}): {status}");
                    notifier
                        .lock()
                        .notify(format!("Process {pid} finished running."));
                }
                Err(err) => {
                    jobs.lock().remove_by_pid(pid);
                    log::warn!("wait on pid {pid} ({name}) failed: {err}");
                }
            }
        })
    }
}
