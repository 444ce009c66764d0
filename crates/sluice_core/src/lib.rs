//! SLUICE Core Types
//!
//! Pure types shared by every tool family: the error taxonomy, the uniform
//! response shape, danger classes and switches, identifier handling, output
//! limits, path resolution and process settings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod danger;
pub mod error;
pub mod ident;
pub mod limit;
pub mod path;
pub mod response;

// Re-exports
pub use config::{ConfigError, GitSettings, LogFormat, PgSettings, ServerSettings, Settings, SslMode};
pub use danger::{DangerClass, DangerSwitch, EnvSwitch, FixedSwitch, DANGER_FLAG};
pub use error::{ErrorKind, ToolError, ToolResult};
pub use limit::{clamp_limit, truncate_chars, truncate_items, Truncated};
pub use path::EntryType;
pub use response::{confirmation, Outcome, Payload, Response};
