//! Declarative per-operation rules.
//!
//! Rules run after schema enforcement, against arguments that are already
//! typed, trimmed and defaulted. The first failing rule decides the error.

use serde_json::{Map, Value};
use sluice_core::{clamp_limit, path, ToolError, ToolResult};
use std::path::Path;

use crate::descriptor::{DefaultValue, OperationSpec};
use crate::sql_guard::check_read_only;

/// Expected kind of filesystem object for [`Rule::PathIs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Anything that exists
    Any,
    /// Regular file
    File,
    /// Directory
    Dir,
}

/// SQL privilege keywords accepted by [`Rule::PrivilegeList`]
pub const SQL_PRIVILEGES: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "TRUNCATE",
    "REFERENCES",
    "TRIGGER",
    "USAGE",
    "CREATE",
    "CONNECT",
    "TEMPORARY",
    "TEMP",
    "EXECUTE",
    "ALL",
    "ALL PRIVILEGES",
];

/// One declarative rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Predicate must be present and non-blank
    NonEmptyFilter(&'static str),
    /// Non-positive falls back to the default, anything above `max` is cut
    ClampLimit {
        /// Integer argument
        param: &'static str,
        /// Upper bound
        max: u64,
    },
    /// Case-insensitive allow-list; the value is lowercased
    OneOf {
        /// String argument
        param: &'static str,
        /// Accepted values, lowercase
        allowed: &'static [&'static str],
    },
    /// Case-insensitive deny-list
    NotOneOf {
        /// String argument
        param: &'static str,
        /// Rejected values, lowercase
        denied: &'static [&'static str],
    },
    /// At least one of the arguments must be supplied
    AtLeastOne(&'static [&'static str]),
    /// Integer must be greater than zero
    Positive(&'static str),
    /// Comma-separated SQL privilege keywords, normalized to uppercase
    PrivilegeList(&'static str),
    /// Statement must be a read-only SELECT
    ReadOnlySql(&'static str),
    /// Like [`Rule::ReadOnlySql`], only while a boolean argument is true
    ReadOnlySqlWhen {
        /// Statement argument
        param: &'static str,
        /// Boolean argument enabling the check
        flag: &'static str,
    },
    /// Path must exist with the given kind
    PathIs {
        /// Path argument
        param: &'static str,
        /// Expected kind
        kind: PathKind,
    },
    /// Path must not exist yet
    PathAbsent(&'static str),
}

/// Context a rule may consult
pub struct RuleContext<'a> {
    /// Operation being checked
    pub spec: &'a OperationSpec,
    /// Root for relative paths
    pub fs_root: &'a Path,
}

impl Rule {
    /// Whether applying the rule stats the filesystem
    #[must_use]
    pub fn touches_filesystem(&self) -> bool {
        matches!(self, Self::PathIs { .. } | Self::PathAbsent(_))
    }

    /// Apply the rule, possibly rewriting arguments in place.
    ///
    /// Path rules call blocking `std::fs`; async callers go through
    /// [`crate::Gate::admit`].
    ///
    /// # Errors
    ///
    /// Returns the error the invocation should fail with.
    pub fn apply(&self, ctx: &RuleContext<'_>, args: &mut Map<String, Value>) -> ToolResult<()> {
        match *self {
            Self::NonEmptyFilter(param) => {
                let blank = args
                    .get(param)
                    .and_then(Value::as_str)
                    .map_or(true, |s| s.trim().is_empty());
                if blank {
                    return Err(ToolError::validation(
                        param,
                        "a non-empty filter is required; refusing to affect every row",
                    ));
                }
            }
            Self::ClampLimit { param, max } => {
                let default = match ctx.spec.param(param).and_then(|p| p.default) {
                    Some(DefaultValue::Int(n)) if n > 0 => n as u64,
                    _ => max,
                };
                let requested = args.get(param).and_then(Value::as_i64);
                let clamped = clamp_limit(requested, default, max);
                args.insert(param.to_string(), Value::from(clamped));
            }
            Self::OneOf { param, allowed } => {
                if let Some(value) = args.get(param).and_then(Value::as_str) {
                    let lowered = value.to_ascii_lowercase();
                    if !allowed.contains(&lowered.as_str()) {
                        return Err(ToolError::validation(
                            param,
                            format!("{:?} is not one of {}", value, allowed.join(", ")),
                        ));
                    }
                    args.insert(param.to_string(), Value::from(lowered));
                }
            }
            Self::NotOneOf { param, denied } => {
                if let Some(value) = args.get(param).and_then(Value::as_str) {
                    if denied.contains(&value.to_ascii_lowercase().as_str()) {
                        return Err(ToolError::validation(
                            param,
                            format!("{:?} is protected and cannot be used here", value),
                        ));
                    }
                }
            }
            Self::AtLeastOne(params) => {
                if !params.iter().any(|p| args.contains_key(*p)) {
                    return Err(ToolError::validation(
                        params.join("|"),
                        format!("at least one of {} is required", params.join(", ")),
                    ));
                }
            }
            Self::Positive(param) => {
                if let Some(n) = args.get(param).and_then(Value::as_i64) {
                    if n <= 0 {
                        return Err(ToolError::validation(param, "must be greater than zero"));
                    }
                }
            }
            Self::PrivilegeList(param) => {
                if let Some(raw) = args.get(param).and_then(Value::as_str) {
                    let normalized = normalize_privileges(param, raw)?;
                    args.insert(param.to_string(), Value::from(normalized));
                }
            }
            Self::ReadOnlySql(param) => {
                if let Some(sql) = args.get(param).and_then(Value::as_str) {
                    check_read_only(param, sql)?;
                }
            }
            Self::ReadOnlySqlWhen { param, flag } => {
                let enabled = args.get(flag).and_then(Value::as_bool).unwrap_or(false);
                if enabled {
                    if let Some(sql) = args.get(param).and_then(Value::as_str) {
                        check_read_only(param, sql)?;
                    }
                }
            }
            Self::PathIs { param, kind } => {
                if let Some(raw) = args.get(param).and_then(Value::as_str) {
                    check_path_kind(ctx.fs_root, raw, kind)?;
                }
            }
            Self::PathAbsent(param) => {
                if let Some(raw) = args.get(param).and_then(Value::as_str) {
                    let resolved = path::resolve(ctx.fs_root, raw);
                    if std::fs::symlink_metadata(&resolved).is_ok() {
                        return Err(ToolError::conflict(format!("{} already exists", raw)));
                    }
                }
            }
        }
        Ok(())
    }
}

fn normalize_privileges(param: &str, raw: &str) -> ToolResult<String> {
    let mut out = Vec::new();
    for item in raw.split(',') {
        let word = item.split_whitespace().collect::<Vec<_>>().join(" ");
        let upper = word.to_ascii_uppercase();
        if upper.is_empty() {
            return Err(ToolError::validation(param, "empty privilege in list"));
        }
        if !SQL_PRIVILEGES.contains(&upper.as_str()) {
            return Err(ToolError::validation(
                param,
                format!("unknown privilege {:?}", word),
            ));
        }
        out.push(upper);
    }
    Ok(out.join(", "))
}

fn check_path_kind(root: &Path, raw: &str, kind: PathKind) -> ToolResult<()> {
    let resolved = path::resolve(root, raw);
    let meta = std::fs::metadata(&resolved).map_err(|e| ToolError::from_io(raw, &e))?;
    let found = path::EntryType::of(&meta);
    match kind {
        PathKind::Any => Ok(()),
        PathKind::File if meta.is_file() => Ok(()),
        PathKind::Dir if meta.is_dir() => Ok(()),
        PathKind::File => Err(ToolError::type_mismatch(raw, "file", found.as_str())),
        PathKind::Dir => Err(ToolError::type_mismatch(raw, "directory", found.as_str())),
    }
}
