//! Consistency checks for descriptor tables.
//!
//! Catches mistakes in the static tables at registration time instead of on
//! the first call: duplicate names, rules naming undeclared parameters, and
//! limits without an integer default.

use sluice_policy::{DefaultValue, OperationSpec, ParamType, Rule};
use std::collections::HashSet;

/// Descriptor table defect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Operation name is not lowercase snake case
    #[error("Invalid operation name: {name}")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// Two parameters share a name
    #[error("{operation}: duplicate parameter {param}")]
    DuplicateParam {
        /// Operation
        operation: String,
        /// Parameter
        param: String,
    },

    /// A rule names a parameter the operation does not declare
    #[error("{operation}: rule refers to undeclared parameter {param}")]
    UndeclaredParam {
        /// Operation
        operation: String,
        /// Parameter
        param: String,
    },

    /// A rule is attached to a parameter of the wrong type
    #[error("{operation}: rule on {param} needs a {expected} parameter")]
    WrongParamType {
        /// Operation
        operation: String,
        /// Parameter
        param: String,
        /// Required type
        expected: String,
    },

    /// Operation declares a family other than its handler's
    #[error("{operation}: declared family {declared}, registered under {handler}")]
    FamilyMismatch {
        /// Operation
        operation: String,
        /// Family in the descriptor
        declared: String,
        /// Family of the handler
        handler: String,
    },
}

/// Check one descriptor
///
/// # Errors
///
/// Returns the first defect found.
pub fn validate_spec(spec: &OperationSpec) -> Result<(), CatalogError> {
    let valid_name = !spec.name.is_empty()
        && spec
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid_name {
        return Err(CatalogError::InvalidName {
            name: spec.name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for param in spec.params {
        if !seen.insert(param.name) {
            return Err(CatalogError::DuplicateParam {
                operation: spec.name.to_string(),
                param: param.name.to_string(),
            });
        }
    }

    for rule in spec.rules {
        for (param, expected) in rule_params(rule) {
            let Some(declared) = spec.param(param) else {
                return Err(CatalogError::UndeclaredParam {
                    operation: spec.name.to_string(),
                    param: param.to_string(),
                });
            };
            if let Some(expected) = expected {
                if declared.kind != expected {
                    return Err(CatalogError::WrongParamType {
                        operation: spec.name.to_string(),
                        param: param.to_string(),
                        expected: format!("{:?}", expected),
                    });
                }
            }
        }
        if let Rule::ClampLimit { param, .. } = rule {
            let has_default = matches!(
                spec.param(param).and_then(|p| p.default),
                Some(DefaultValue::Int(n)) if n > 0
            );
            if !has_default {
                return Err(CatalogError::WrongParamType {
                    operation: spec.name.to_string(),
                    param: param.to_string(),
                    expected: "positive integer default for a".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Parameters a rule reads, with the type it expects where it matters
fn rule_params(rule: &Rule) -> Vec<(&'static str, Option<ParamType>)> {
    match *rule {
        Rule::NonEmptyFilter(p) | Rule::ReadOnlySql(p) | Rule::PrivilegeList(p) => {
            vec![(p, Some(ParamType::String))]
        }
        Rule::ClampLimit { param, .. } | Rule::Positive(param) => {
            vec![(param, Some(ParamType::Integer))]
        }
        Rule::OneOf { param, .. } | Rule::NotOneOf { param, .. } => vec![(param, None)],
        Rule::AtLeastOne(params) => params.iter().map(|p| (*p, None)).collect(),
        Rule::ReadOnlySqlWhen { param, flag } => vec![
            (param, Some(ParamType::String)),
            (flag, Some(ParamType::Boolean)),
        ],
        Rule::PathIs { param, .. } | Rule::PathAbsent(param) => {
            vec![(param, Some(ParamType::Path))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_policy::ParamSpec;

    #[test]
    fn test_valid_spec() {
        static OK: OperationSpec = OperationSpec {
            params: &[ParamSpec::int("limit").default_int(20)],
            rules: &[Rule::ClampLimit {
                param: "limit",
                max: 100,
            }],
            ..OperationSpec::safe("pg", "pg_slowest_queries", "Slowest statements")
        };
        assert!(validate_spec(&OK).is_ok());
    }

    #[test]
    fn test_undeclared_rule_param() {
        static BAD: OperationSpec = OperationSpec {
            rules: &[Rule::NonEmptyFilter("where_clause")],
            ..OperationSpec::dangerous("pg", "pg_delete_data", "Delete rows")
        };
        assert!(matches!(
            validate_spec(&BAD),
            Err(CatalogError::UndeclaredParam { .. })
        ));
    }

    #[test]
    fn test_clamp_without_default() {
        static BAD: OperationSpec = OperationSpec {
            params: &[ParamSpec::int("limit")],
            rules: &[Rule::ClampLimit {
                param: "limit",
                max: 100,
            }],
            ..OperationSpec::safe("pg", "pg_x", "x")
        };
        assert!(validate_spec(&BAD).is_err());
    }

    #[test]
    fn test_duplicate_param() {
        static BAD: OperationSpec = OperationSpec {
            params: &[ParamSpec::string("a"), ParamSpec::int("a")],
            ..OperationSpec::safe("pg", "pg_x", "x")
        };
        assert!(matches!(
            validate_spec(&BAD),
            Err(CatalogError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_invalid_name() {
        static BAD: OperationSpec = OperationSpec::safe("pg", "Pg-Thing", "x");
        assert!(matches!(
            validate_spec(&BAD),
            Err(CatalogError::InvalidName { .. })
        ));
    }
}
