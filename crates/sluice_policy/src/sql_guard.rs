//! Read-only guard for caller-supplied SQL.
//!
//! A lexical screen, not a parser: it rejects write keywords, `SELECT ...
//! INTO` and server functions with side effects anywhere in the text,
//! comments and literals included. The executor additionally runs guarded
//! statements in a `READ ONLY` transaction.

use once_cell::sync::Lazy;
use regex::Regex;
use sluice_core::{ToolError, ToolResult};

static WRITE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:insert|update|delete|merge|create|alter|drop|truncate|grant|revoke|copy|call|do|execute|vacuum|analyze|reindex|into|lock|listen|notify|refresh)\b",
    )
    .expect("keyword pattern is valid")
});

static SIDE_EFFECT_FUNCTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:pg_terminate_backend|pg_cancel_backend|pg_reload_conf|pg_rotate_logfile|pg_switch_wal|pg_promote|pg_create_restore_point|pg_notify|set_config|nextval|setval|dblink\w*|pg_(?:try_)?advisory_\w+|lo_(?:import|export|unlink|create|creat|open|write|put|truncate|from_bytea)|pg_read_(?:binary_)?file|pg_ls_dir|pg_stat_reset\w*|pg_(?:create|drop)_\w*replication_slot|query_to_xml\w*|txid_current|pg_current_xact_id)\b",
    )
    .expect("function pattern is valid")
});

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bu&["']"#).expect("escape pattern is valid"));

/// Strip one trailing semicolon and surrounding whitespace
#[must_use]
pub fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

/// Reject anything but a single read-only SELECT (or WITH ... SELECT).
///
/// # Errors
///
/// Returns a validation error naming `param` when the statement could write.
pub fn check_read_only(param: &str, sql: &str) -> ToolResult<()> {
    let body = strip_terminator(sql);
    if body.is_empty() {
        return Err(ToolError::validation(param, "SQL is required"));
    }
    if body.contains(';') {
        return Err(ToolError::validation(
            param,
            "multiple statements are not allowed",
        ));
    }
    if let Some(hit) = WRITE_KEYWORDS.find(body) {
        return Err(ToolError::validation(
            param,
            format!(
                "only read-only SELECT statements are allowed (found {:?}); use the dedicated admin tools instead",
                hit.as_str()
            ),
        ));
    }
    if let Some(hit) = SIDE_EFFECT_FUNCTIONS.find(body) {
        return Err(ToolError::validation(
            param,
            format!(
                "function {:?} has side effects and is not allowed in read-only queries",
                hit.as_str()
            ),
        ));
    }
    if UNICODE_ESCAPE.is_match(body) {
        return Err(ToolError::validation(
            param,
            "Unicode-escaped names and strings are not allowed in read-only queries",
        ));
    }
    let first = body
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if first != "select" && first != "with" {
        return Err(ToolError::validation(param, "query must start with SELECT"));
    }
    Ok(())
}
