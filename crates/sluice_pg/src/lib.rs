//! SLUICE PostgreSQL Tools
//!
//! The `pg` tool family: catalog introspection, administration, monitoring
//! and data manipulation over a pooled sqlx connection. Statements run
//! through the [`SqlExecutor`] trait so tests can record them instead.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod catalog;
pub mod ddl;
pub mod executor;
pub mod export;
mod ops;
pub mod testing;
pub mod tools;

pub use executor::{PgExecutor, Row, SqlExecutor, SqlParam};
pub use testing::RecordingExecutor;
pub use tools::PgTools;
