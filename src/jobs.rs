//! The job table: every external process launched in parallel mode and
//! not yet reaped.
//!
//! Records are appended by the launcher at spawn time and removed by the
//! reaper once the process terminates. The table is shared between the
//! interpreter thread and the reaper's waiter threads, so all access goes
//! through [`SharedJobTable`], a mutex-wrapped handle.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle state of a tracked job.
///
/// `Dead` is transient: the reaper marks a job dead and deletes it inside
/// the same critical section, so `jobs` never displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Paused,
    Dead,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "RUNNING"),
            JobState::Paused => write!(f, "PAUSED"),
            JobState::Dead => write!(f, "DEAD"),
        }
    }
}

/// One tracked process.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// OS process id. Unique while the process lives; the table never
    /// retains a reaped pid, so reuse by the OS cannot alias a record.
    pub pid: i32,
    /// The command text as typed, also usable as a lookup key for
    /// registrations that never obtained a real pid.
    pub name: String,
    pub state: JobState,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("no live job with pid {0}")]
    NotFound(i32),
}

/// Ordered collection of live jobs. Insertion order is display order.
#[derive(Debug, Default)]
pub struct JobTable {
    entries: Vec<JobRecord>,
}

/// Handle shared between the interpreter and the waiter threads.
pub type SharedJobTable = Arc<Mutex<JobTable>>;

/// Create an empty shared table.
pub fn shared_table() -> SharedJobTable {
    Arc::new(Mutex::new(JobTable::new()))
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly spawned process at the tail with state `RUNNING`.
    pub fn append(&mut self, pid: i32, name: impl Into<String>) {
        self.entries.push(JobRecord {
            pid,
            name: name.into(),
            state: JobState::Running,
        });
    }

    /// Delete the record for `pid`. Returns whether one was found.
    ///
    /// A miss is expected and benign: the pid may already have been
    /// reaped, or was never registered because the launch was sequential.
    pub fn remove_by_pid(&mut self, pid: i32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|job| job.pid != pid);
        self.entries.len() != before
    }

    /// Delete the first record whose command text is `name`. Returns
    /// whether one was found. Covers registrations whose pid never
    /// materialized.
    pub fn remove_by_name(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|job| job.name == name) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Transition a live job between `RUNNING` and `PAUSED` (the reaper
    /// also passes through `DEAD` just before deletion).
    pub fn set_state(&mut self, pid: i32, state: JobState) -> Result<(), JobError> {
        match self.entries.iter_mut().find(|job| job.pid == pid) {
            Some(job) => {
                job.state = state;
                Ok(())
            }
            None => Err(JobError::NotFound(pid)),
        }
    }

    /// Look up a live job by pid.
    pub fn get(&self, pid: i32) -> Option<&JobRecord> {
        self.entries.iter().find(|job| job.pid == pid)
    }

    /// Read view for the `jobs` builtin, in insertion order.
    pub fn list(&self) -> &[JobRecord] {
        &self.entries
    }

    /// Number of live jobs. Gates shell exit.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_tracks_insertion_order() {
        let mut table = JobTable::new();
        table.append(10, "first");
        table.append(20, "second");
        table.append(30, "third");

        let names: Vec<_> = table.list().iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(table.count(), 3);
        assert!(table.list().iter().all(|j| j.state == JobState::Running));
    }

    #[test]
    fn remove_by_pid_reports_misses() {
        let mut table = JobTable::new();
        table.append(10, "sleep 5");

        assert!(table.remove_by_pid(10));
        assert!(!table.remove_by_pid(10));
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn remove_by_name_only_takes_first_match() {
        let mut table = JobTable::new();
        table.append(10, "sleep 5");
        table.append(20, "sleep 5");

        assert!(table.remove_by_name("sleep 5"));
        assert_eq!(table.count(), 1);
        assert_eq!(table.list()[0].pid, 20);
        assert!(!table.remove_by_name("never registered"));
    }

    #[test]
    fn set_state_round_trips_pause_and_resume() {
        let mut table = JobTable::new();
        table.append(10, "sleep 5");

        table.set_state(10, JobState::Paused).unwrap();
        assert_eq!(table.get(10).unwrap().state, JobState::Paused);

        table.set_state(10, JobState::Running).unwrap();
        assert_eq!(table.get(10).unwrap().state, JobState::Running);
    }

    #[test]
    fn set_state_on_unknown_pid_is_not_found() {
        let mut table = JobTable::new();
        assert_eq!(table.set_state(42, JobState::Paused), Err(JobError::NotFound(42)));
    }

    #[test]
    fn states_display_like_the_jobs_listing() {
        assert_eq!(JobState::Running.to_string(), "RUNNING");
        assert_eq!(JobState::Paused.to_string(), "PAUSED");
        assert_eq!(JobState::Dead.to_string(), "DEAD");
    }
}
