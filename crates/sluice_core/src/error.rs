//! Error taxonomy shared by the gate and every tool family.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

use crate::danger::DANGER_FLAG;

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

/// Classification of a failed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Dangerous operation requested while the danger switch is off
    Authorization,
    /// Malformed, missing or unsafe input
    Validation,
    /// Referenced object does not exist
    NotFound,
    /// Referenced path exists but has the wrong type
    TypeMismatch,
    /// External system refused the operation for state reasons
    Conflict,
    /// External system failed
    Upstream,
}

impl ErrorKind {
    /// Stable snake_case name used in response payloads
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::TypeMismatch => "type_mismatch",
            Self::Conflict => "conflict",
            Self::Upstream => "upstream",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by the gate or by a collaborator call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Dangerous operation while disabled
    #[error("{operation} requires {flag}=true in environment")]
    Authorization {
        /// Operation that was refused
        operation: String,
        /// Name of the switch that must be enabled
        flag: String,
    },

    /// Input rejected before reaching the collaborator
    #[error("Validation failed for {field}: {reason}")]
    Validation {
        /// Offending argument
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Object does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of object (file, table, operation, ...)
        kind: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Path has the wrong type
    #[error("Type mismatch for {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Offending path
        path: String,
        /// Expected type
        expected: String,
        /// Actual type
        found: String,
    },

    /// Rejected because of the current state of the external system
    #[error("Conflict: {reason}")]
    Conflict {
        /// Explanation, usually from the collaborator
        reason: String,
    },

    /// Collaborator failure, message preserved verbatim
    #[error("{system} error: {message}")]
    Upstream {
        /// Collaborator name (postgres, git, filesystem)
        system: String,
        /// Original message text
        message: String,
    },
}

impl ToolError {
    /// Authorization failure for an operation gated by the danger switch
    #[must_use]
    pub fn authorization(operation: &str) -> Self {
        Self::Authorization {
            operation: operation.to_string(),
            flag: DANGER_FLAG.to_string(),
        }
    }

    /// Validation failure
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Not-found failure
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Type mismatch failure
    #[must_use]
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Conflict failure
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Collaborator failure
    #[must_use]
    pub fn upstream(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            system: system.into(),
            message: message.into(),
        }
    }

    /// Classify an io error raised while touching `path`
    #[must_use]
    pub fn from_io(path: impl fmt::Display, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found("path", path.to_string()),
            io::ErrorKind::AlreadyExists => {
                Self::conflict(format!("{}: {}", path, err))
            }
            io::ErrorKind::DirectoryNotEmpty => {
                Self::conflict(format!("{}: {}", path, err))
            }
            _ => Self::upstream("filesystem", format!("{}: {}", path, err)),
        }
    }

    /// Taxonomy bucket of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}
