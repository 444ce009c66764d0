//! Static operation descriptors.
//!
//! Every tool family declares its operations as a `static` table of
//! [`OperationSpec`] struct literals, filling `params` and `rules` and taking
//! the rest from [`OperationSpec::safe`] or [`OperationSpec::dangerous`]:
//!
//! ```
//! use sluice_policy::{OperationSpec, ParamSpec, Rule};
//!
//! static OPERATIONS: &[OperationSpec] = &[OperationSpec {
//!     params: &[ParamSpec::int("max_rows").default_int(1000)],
//!     rules: &[Rule::ClampLimit { param: "max_rows", max: 10_000 }],
//!     ..OperationSpec::safe("pg", "pg_query", "Run a read-only query")
//! }];
//! assert_eq!(OPERATIONS[0].params.len(), 1);
//! ```
//!
//! The gate interprets the table on each call; nothing here is mutable.

use serde::Serialize;
use sluice_core::DangerClass;

use crate::rule::Rule;

/// Type accepted for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Free text
    String,
    /// SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`, at most 63 chars)
    Identifier,
    /// Comma-separated identifiers, normalized to an array
    IdentifierList,
    /// Signed integer, numeric strings accepted
    Integer,
    /// Boolean, `"true"`/`"false"` strings accepted
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// Filesystem path, resolved against the root
    Path,
    /// Git revision, branch or remote name
    GitRef,
    /// Any JSON value
    Any,
}

impl ParamType {
    /// JSON schema type name
    #[must_use]
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::String | Self::Identifier | Self::IdentifierList | Self::Path | Self::GitRef => {
                Some("string")
            }
            Self::Integer => Some("integer"),
            Self::Boolean => Some("boolean"),
            Self::Array => Some("array"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }
}

/// Default filled in when a parameter is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Text default
    Str(&'static str),
    /// Integer default
    Int(i64),
    /// Boolean default
    Bool(bool),
}

impl DefaultValue {
    /// JSON form of the default
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::from(*s),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Bool(b) => serde_json::Value::from(*b),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Argument name
    pub name: &'static str,
    /// Accepted type
    pub kind: ParamType,
    /// Whether the argument must be supplied
    pub required: bool,
    /// Value used when absent
    pub default: Option<DefaultValue>,
    /// Keep the string exactly as supplied (no trimming, blank allowed)
    pub verbatim: bool,
    /// Help text
    pub description: &'static str,
}

impl ParamSpec {
    /// Optional parameter of the given type
    #[must_use]
    pub const fn new(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            verbatim: false,
            description: "",
        }
    }

    /// Free-text parameter
    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self::new(name, ParamType::String)
    }

    /// Identifier parameter
    #[must_use]
    pub const fn ident(name: &'static str) -> Self {
        Self::new(name, ParamType::Identifier)
    }

    /// Identifier list parameter
    #[must_use]
    pub const fn ident_list(name: &'static str) -> Self {
        Self::new(name, ParamType::IdentifierList)
    }

    /// Integer parameter
    #[must_use]
    pub const fn int(name: &'static str) -> Self {
        Self::new(name, ParamType::Integer)
    }

    /// Boolean parameter
    #[must_use]
    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// Path parameter
    #[must_use]
    pub const fn path(name: &'static str) -> Self {
        Self::new(name, ParamType::Path)
    }

    /// Git ref parameter
    #[must_use]
    pub const fn git_ref(name: &'static str) -> Self {
        Self::new(name, ParamType::GitRef)
    }

    /// Mark as required
    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    /// Keep the value untrimmed; blank strings count as supplied
    #[must_use]
    pub const fn verbatim(self) -> Self {
        Self {
            verbatim: true,
            ..self
        }
    }

    /// Text default
    #[must_use]
    pub const fn default_str(self, value: &'static str) -> Self {
        Self {
            default: Some(DefaultValue::Str(value)),
            ..self
        }
    }

    /// Integer default
    #[must_use]
    pub const fn default_int(self, value: i64) -> Self {
        Self {
            default: Some(DefaultValue::Int(value)),
            ..self
        }
    }

    /// Boolean default
    #[must_use]
    pub const fn default_bool(self, value: bool) -> Self {
        Self {
            default: Some(DefaultValue::Bool(value)),
            ..self
        }
    }

    /// Attach help text
    #[must_use]
    pub const fn describe(self, description: &'static str) -> Self {
        Self {
            description,
            ..self
        }
    }
}

/// Descriptor of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationSpec {
    /// Unique operation name
    pub name: &'static str,
    /// Tool family (notes, fs, git, pg)
    pub family: &'static str,
    /// One-line description
    pub summary: &'static str,
    /// Danger classification
    pub danger: DangerClass,
    /// Declared parameters, in order
    pub params: &'static [ParamSpec],
    /// Rules evaluated after schema enforcement, in order
    #[serde(skip)]
    pub rules: &'static [Rule],
}

impl OperationSpec {
    /// Safe operation with no parameters
    #[must_use]
    pub const fn safe(family: &'static str, name: &'static str, summary: &'static str) -> Self {
        Self {
            name,
            family,
            summary,
            danger: DangerClass::Safe,
            params: &[],
            rules: &[],
        }
    }

    /// Dangerous operation with no parameters
    #[must_use]
    pub const fn dangerous(
        family: &'static str,
        name: &'static str,
        summary: &'static str,
    ) -> Self {
        Self {
            danger: DangerClass::Dangerous,
            ..Self::safe(family, name, summary)
        }
    }

    /// Look up a parameter by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether any rule stats the filesystem
    #[must_use]
    pub fn touches_filesystem(&self) -> bool {
        self.rules.iter().any(Rule::touches_filesystem)
    }

    /// Whether the danger switch gates this operation
    #[must_use]
    pub fn is_dangerous(&self) -> bool {
        self.danger.is_dangerous()
    }
}
