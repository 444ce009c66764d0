//! Startup errors.

use sluice_tool::RegistryError;
use std::net::SocketAddr;

/// Failure while assembling or running the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `--require-postgres` was given but the SQL settings are incomplete
    #[error("PostgreSQL is required but {var} is not set")]
    PostgresRequired {
        /// First missing variable
        var: String,
    },

    /// `FS_ROOT` does not name an accessible directory
    #[error("FS_ROOT {path} is not usable: {source}")]
    FsRoot {
        /// Configured root
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// A tool family's descriptor table was rejected
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The HTTP listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// Transport I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
