//! SLUICE Git Tools
//!
//! The `git` tool family. Git runs as a child process behind the
//! [`GitRunner`] trait so tests can substitute a recording runner.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod runner;
pub mod testing;
pub mod tools;

pub use runner::{git_error, GitOutput, GitRunner, ProcessGitRunner};
pub use testing::RecordingGitRunner;
pub use tools::GitTools;
