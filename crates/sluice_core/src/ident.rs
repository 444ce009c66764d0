//! Identifier validation and quoting for generated command strings.
//!
//! Identifiers (schema, table, column, index, role and database names) are
//! interpolated into SQL text and must pass [`is_identifier`] first. Git
//! revisions and branch names are interpolated into an argv and must pass
//! [`is_git_ref`] so they can never be read as options.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest identifier PostgreSQL keeps without truncation
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

static GIT_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._/@^~-]+$").expect("git ref pattern is valid"));

/// Check a bare identifier
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    value.len() <= MAX_IDENTIFIER_LEN && IDENTIFIER.is_match(value)
}

/// Explain why `value` is not an identifier, if it is not
#[must_use]
pub fn identifier_problem(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("must not be empty".to_string());
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Some(format!("longer than {} characters", MAX_IDENTIFIER_LEN));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Some(format!(
            "invalid character {:?} (use letters, digits and underscore only)",
            bad
        ));
    }
    if value.starts_with(|c: char| c.is_ascii_digit()) {
        return Some("must not start with a digit".to_string());
    }
    None
}

/// Split a comma-separated identifier list, trimming each element
#[must_use]
pub fn split_identifier_list(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).collect()
}

/// Double-quote a validated identifier
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Double-quote a schema-qualified name
#[must_use]
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quote a string literal for statements that cannot take bind parameters.
///
/// Assumes `standard_conforming_strings = on`, the server default.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Check a git revision, branch, tag or remote name
#[must_use]
pub fn is_git_ref(value: &str) -> bool {
    !value.starts_with('-') && !value.contains("..") && GIT_REF.is_match(value)
}
