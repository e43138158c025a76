//! The executable search list.
//!
//! Loaded once at startup, either from a configuration file (one directory
//! per line) or from the inherited `PATH` variable, and immutable after
//! that. The resolver in [`crate::external`] probes these directories in
//! order.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ordered list of directories searched when resolving a bare command name.
#[derive(Debug, Clone)]
pub struct SearchPath {
    dirs: Vec<String>,
}

impl SearchPath {
    /// Build a search path from an explicit list of directories.
    pub fn from_entries(dirs: Vec<String>) -> Self {
        Self { dirs }
    }

    /// Load the search path from `file`, one directory per line.
    ///
    /// Blank lines are skipped. A missing or unreadable file is an error;
    /// the shell cannot resolve anything without a search list.
    pub fn load(file: &Path) -> Result<Self> {
        let contents = fs::read_to_string(file)
            .with_context(|| format!("failed to open search path file {}", file.display()))?;
        let dirs: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        log::info!("loaded {} search directories from {}", dirs.len(), file.display());
        Ok(Self { dirs })
    }

    /// Alternate startup path: take the list from the `PATH` environment
    /// variable, split on `:`.
    pub fn from_path_env() -> Result<Self> {
        let raw = std::env::var("PATH").context("PATH is not set")?;
        let dirs: Vec<String> = std::env::split_paths(&raw)
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|d| !d.is_empty())
            .collect();
        log::info!("loaded {} search directories from PATH", dirs.len());
        Ok(Self { dirs })
    }

    /// The directories, in probe order.
    pub fn list(&self) -> &[String] {
        &self.dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_one_directory_per_line_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "/usr/local/bin").unwrap();
        writeln!(file, "/usr/bin").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "/bin").unwrap();

        let sp = SearchPath::load(file.path()).unwrap();
        assert_eq!(sp.list(), ["/usr/local/bin", "/usr/bin", "/bin"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = SearchPath::load(Path::new("/nonexistent/shell-config")).unwrap_err();
        assert!(err.to_string().contains("shell-config"));
    }

    #[test]
    fn path_env_splits_on_colon() {
        let sp = SearchPath::from_path_env().unwrap();
        assert!(!sp.list().is_empty());
        assert!(sp.list().iter().all(|d| !d.contains(':')));
    }
}
