//! Snapshot of the process environment seen by launched commands.

use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment.
///
/// Holds the variable map handed to spawned children and the working
/// directory commands run in. Captured once when the session starts;
/// `cd` is the only thing that mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g. PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution and the prompt.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Get the value of an environment variable, falling back to the
    /// process environment for keys not overridden in this session.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable for this session.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_var() {
        let mut env = Environment::new();
        assert_eq!(env.get_var("JOBSHELL_TEST_VAR_12345"), None);
        env.set_var("JOBSHELL_TEST_VAR_12345", "VALUE");
        assert_eq!(
            env.get_var("JOBSHELL_TEST_VAR_12345"),
            Some("VALUE".to_string())
        );
    }

    #[test]
    fn reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }
}
