//! Danger classes and the switch that gates dangerous operations.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Name of the environment variable that enables dangerous operations
pub const DANGER_FLAG: &str = "ENABLE_DANGEROUS";

/// Static classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerClass {
    /// Always permitted
    Safe,
    /// Permitted only while the danger switch is on
    Dangerous,
}

impl DangerClass {
    /// Whether this class is gated by the switch
    #[must_use]
    pub fn is_dangerous(&self) -> bool {
        matches!(self, Self::Dangerous)
    }

    /// Display name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Dangerous => "dangerous",
        }
    }
}

impl std::fmt::Display for DangerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the process-wide danger permission.
///
/// Implementations are consulted on every invocation; nothing is cached.
pub trait DangerSwitch: Send + Sync {
    /// Whether dangerous operations may run right now
    fn allowed(&self) -> bool;
}

/// Switch backed by an environment variable, read fresh on each call
#[derive(Debug, Clone)]
pub struct EnvSwitch {
    var: String,
}

impl EnvSwitch {
    /// Switch reading [`DANGER_FLAG`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_var(DANGER_FLAG)
    }

    /// Switch reading a custom variable
    #[must_use]
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl DangerSwitch for EnvSwitch {
    fn allowed(&self) -> bool {
        std::env::var(&self.var)
            .map(|v| parse_flag(&v))
            .unwrap_or(false)
    }
}

/// In-memory switch, toggled explicitly
#[derive(Debug, Default)]
pub struct FixedSwitch {
    allowed: AtomicBool,
}

impl FixedSwitch {
    /// Create a switch in the given state
    #[must_use]
    pub fn new(allowed: bool) -> Self {
        Self {
            allowed: AtomicBool::new(allowed),
        }
    }

    /// Flip the switch
    pub fn set(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }
}

impl DangerSwitch for FixedSwitch {
    fn allowed(&self) -> bool {
        self.allowed.load(Ordering::SeqCst)
    }
}

/// Interpret a boolean setting; only `true` (any case) enables.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
