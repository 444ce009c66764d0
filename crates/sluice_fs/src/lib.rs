//! SLUICE Filesystem Tools
//!
//! The `notes` family (one append-only text file) and the `fs` family
//! (inspection and mutation of files under a configured root).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fs;
pub mod notes;
pub mod walk;

pub use fs::FsTools;
pub use notes::NotesTools;
