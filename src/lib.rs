//! A line-oriented command interpreter with job control.
//!
//! This crate provides the building blocks of a small shell that launches
//! external programs and tracks their lifecycle: a job table, a launcher
//! with two execution disciplines (sequential and parallel), a reaper that
//! observes child termination asynchronously, and a handful of built-in
//! commands (`cd`, `jobs`, `mode`, `pause`, `resume`, `exit`).
//!
//! The main entry point is [`Interpreter`], which runs the interactive
//! read-eval loop over a [`Session`]. The public modules expose the job
//! table and state types for embedding or testing.

mod builtin;
pub mod command;
pub mod env;
mod external;
pub mod jobs;
mod lexer;
pub mod paths;
pub mod reaper;
pub mod state;
mod interpreter;

pub use interpreter::Interpreter;
pub use paths::SearchPath;
pub use state::Session;
