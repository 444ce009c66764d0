//! The operation gate.
//!
//! Single choke point between a caller and a collaborator. For each call it
//! checks the danger switch, enforces the declared argument schema and runs
//! the operation's rules, in that order. It holds no per-call state.

use serde_json::{Map, Number, Value};
use sluice_core::ident::{identifier_problem, is_git_ref, split_identifier_list};
use sluice_core::{DangerSwitch, ToolError, ToolResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::decision::Decision;
use crate::descriptor::{OperationSpec, ParamSpec, ParamType};
use crate::redact::Redactor;
use crate::rule::RuleContext;

/// Operation gate
#[derive(Clone)]
pub struct Gate {
    switch: Arc<dyn DangerSwitch>,
    fs_root: PathBuf,
    redactor: Redactor,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("dangerous_allowed", &self.switch.allowed())
            .field("fs_root", &self.fs_root)
            .finish()
    }
}

impl Gate {
    /// Create a gate consulting `switch`, resolving paths against `fs_root`
    #[must_use]
    pub fn new(switch: Arc<dyn DangerSwitch>, fs_root: impl Into<PathBuf>) -> Self {
        Self {
            switch,
            fs_root: fs_root.into(),
            redactor: Redactor::new(),
        }
    }

    /// Replace the redactor used for decision records
    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Root for relative paths
    #[must_use]
    pub fn fs_root(&self) -> &Path {
        &self.fs_root
    }

    /// Whether dangerous operations are currently permitted
    #[must_use]
    pub fn dangerous_allowed(&self) -> bool {
        self.switch.allowed()
    }

    /// Check one invocation and return the normalized arguments.
    ///
    /// A decision record is emitted either way.
    ///
    /// # Errors
    ///
    /// Returns the first failure: authorization, then schema, then rules.
    pub fn check(&self, spec: &OperationSpec, args: &Value) -> ToolResult<Map<String, Value>> {
        let result = self.evaluate(spec, args);
        let decision = match &result {
            Ok(normalized) => Decision::allow(spec.name, spec.danger)
                .with_args(self.redactor.redact_args(normalized)),
            Err(err) => {
                let raw = args.as_object().cloned().unwrap_or_default();
                Decision::deny(spec.name, spec.danger, err)
                    .with_args(self.redactor.redact_args(&raw))
            }
        };
        decision.emit();
        result
    }

    /// [`Gate::check`] for async callers.
    ///
    /// Specs whose rules stat the filesystem are checked on the blocking
    /// pool; everything else runs inline.
    ///
    /// # Errors
    ///
    /// Same as [`Gate::check`]. A check that panics comes back as an
    /// upstream error.
    pub async fn admit(
        &self,
        spec: &'static OperationSpec,
        args: &Value,
    ) -> ToolResult<Map<String, Value>> {
        if !spec.touches_filesystem() {
            return self.check(spec, args);
        }
        let gate = self.clone();
        let args = args.clone();
        tokio::task::spawn_blocking(move || gate.check(spec, &args))
            .await
            .map_err(|e| ToolError::upstream("gate", e.to_string()))?
    }

    fn evaluate(&self, spec: &OperationSpec, args: &Value) -> ToolResult<Map<String, Value>> {
        if spec.is_dangerous() && !self.switch.allowed() {
            return Err(ToolError::authorization(spec.name));
        }

        let mut normalized = enforce_schema(spec, args)?;

        let ctx = RuleContext {
            spec,
            fs_root: &self.fs_root,
        };
        for rule in spec.rules {
            rule.apply(&ctx, &mut normalized)?;
        }
        Ok(normalized)
    }
}

/// Validate `args` against the declared parameters.
///
/// Unknown names, missing required values and type mismatches are rejected;
/// strings are trimmed (unless verbatim) and defaults filled in.
///
/// # Errors
///
/// Returns a validation error naming the offending argument.
pub fn enforce_schema(spec: &OperationSpec, args: &Value) -> ToolResult<Map<String, Value>> {
    let supplied = match args {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        _ => {
            return Err(ToolError::validation(
                "arguments",
                "must be a JSON object",
            ));
        }
    };

    if let Some(unknown) = supplied.keys().find(|k| spec.param(k).is_none()) {
        let known: Vec<&str> = spec.params.iter().map(|p| p.name).collect();
        let hint = if known.is_empty() {
            "this operation takes no arguments".to_string()
        } else {
            format!("unknown argument; expected one of {}", known.join(", "))
        };
        return Err(ToolError::validation(unknown.as_str(), hint));
    }

    let mut out = Map::new();
    for param in spec.params {
        match coerce(param, supplied.get(param.name))? {
            Some(value) => {
                out.insert(param.name.to_string(), value);
            }
            None if param.required => {
                return Err(ToolError::validation(param.name, "is required"));
            }
            None => {
                if let Some(default) = param.default {
                    out.insert(param.name.to_string(), default.to_json());
                }
            }
        }
    }
    Ok(out)
}

/// `Ok(None)` means "not supplied"
fn coerce(param: &ParamSpec, raw: Option<&Value>) -> ToolResult<Option<Value>> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let mismatch = |expected: &str| {
        ToolError::validation(
            param.name,
            format!("expected {}, got {}", expected, json_kind(value)),
        )
    };

    let text = |v: &Value| -> ToolResult<Option<String>> {
        let s = v.as_str().ok_or_else(|| mismatch("a string"))?;
        if param.verbatim {
            return Ok(Some(s.to_string()));
        }
        let trimmed = s.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    };

    match param.kind {
        ParamType::String | ParamType::Path => Ok(text(value)?.map(Value::from)),
        ParamType::Identifier => match text(value)? {
            None => Ok(None),
            Some(s) => {
                if let Some(problem) = identifier_problem(&s) {
                    return Err(ToolError::validation(
                        param.name,
                        format!("{:?} is not a valid identifier: {}", s, problem),
                    ));
                }
                Ok(Some(Value::from(s)))
            }
        },
        ParamType::IdentifierList => {
            let items: Vec<String> = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|i| {
                        i.as_str()
                            .map(|s| s.trim().to_string())
                            .ok_or_else(|| mismatch("an array of strings"))
                    })
                    .collect::<ToolResult<_>>()?,
                Value::String(s) if s.trim().is_empty() => return Ok(None),
                Value::String(s) => split_identifier_list(s)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                _ => return Err(mismatch("a comma-separated string")),
            };
            if items.is_empty() {
                return Ok(None);
            }
            for item in &items {
                if let Some(problem) = identifier_problem(item) {
                    return Err(ToolError::validation(
                        param.name,
                        format!("{:?} is not a valid identifier: {}", item, problem),
                    ));
                }
            }
            Ok(Some(Value::from(items)))
        }
        ParamType::GitRef => match text(value)? {
            None => Ok(None),
            Some(s) if is_git_ref(&s) => Ok(Some(Value::from(s))),
            Some(s) => Err(ToolError::validation(
                param.name,
                format!(
                    "{:?} is not a valid git reference (letters, digits, ._/@^~- only; no leading '-' or '..')",
                    s
                ),
            )),
        },
        ParamType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .map(|n| Some(Value::from(n)))
                .ok_or_else(|| mismatch("an integer")),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Some(Value::Number(Number::from(n))))
                .map_err(|_| mismatch("an integer")),
            _ => Err(mismatch("an integer")),
        },
        ParamType::Boolean => match value {
            Value::Bool(b) => Ok(Some(Value::from(*b))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(Value::from(true))),
                "false" => Ok(Some(Value::from(false))),
                _ => Err(mismatch("a boolean")),
            },
            _ => Err(mismatch("a boolean")),
        },
        ParamType::Array => match value {
            Value::Array(_) => Ok(Some(value.clone())),
            _ => Err(mismatch("an array")),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(Some(value.clone())),
            _ => Err(mismatch("an object")),
        },
        ParamType::Any => Ok(Some(value.clone())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{PathKind, Rule};
    use proptest::prelude::*;
    use serde_json::json;
    use sluice_core::{ErrorKind, FixedSwitch};

    static CREATE_INDEX: OperationSpec = OperationSpec {
        params: &[
            ParamSpec::ident("schema").required(),
            ParamSpec::ident("table").required(),
            ParamSpec::ident("index_name").required(),
            ParamSpec::ident_list("columns").required(),
            ParamSpec::boolean("unique").default_bool(false),
            ParamSpec::string("method").default_str("btree"),
        ],
        rules: &[Rule::OneOf {
            param: "method",
            allowed: &["btree", "hash", "gist", "gin", "brin", "spgist"],
        }],
        ..OperationSpec::dangerous("pg", "pg_create_index", "Create an index")
    };

    static DELETE_DATA: OperationSpec = OperationSpec {
        params: &[
            ParamSpec::ident("schema").required(),
            ParamSpec::ident("table").required(),
            ParamSpec::string("where_clause"),
        ],
        rules: &[Rule::NonEmptyFilter("where_clause")],
        ..OperationSpec::dangerous("pg", "pg_delete_data", "Delete rows")
    };

    static QUERY: OperationSpec = OperationSpec {
        params: &[
            ParamSpec::string("sql").required(),
            ParamSpec::int("max_rows").default_int(1000),
        ],
        rules: &[
            Rule::ReadOnlySql("sql"),
            Rule::ClampLimit {
                param: "max_rows",
                max: 10_000,
            },
        ],
        ..OperationSpec::safe("pg", "pg_query", "Run a read-only query")
    };

    static LIST_DIR: OperationSpec = OperationSpec {
        params: &[
            ParamSpec::path("path").default_str("."),
            ParamSpec::boolean("include_hidden").default_bool(false),
        ],
        rules: &[Rule::PathIs {
            param: "path",
            kind: PathKind::Dir,
        }],
        ..OperationSpec::safe("fs", "fs_list_directory", "List a directory")
    };

    fn gate(allowed: bool) -> Gate {
        Gate::new(Arc::new(FixedSwitch::new(allowed)), std::env::temp_dir())
    }

    fn index_args(table: &str) -> Value {
        json!({
            "schema": "public",
            "table": table,
            "index_name": "idx_users_email",
            "columns": "email",
        })
    }

    #[test]
    fn test_dangerous_refused_when_disabled() {
        let err = gate(false)
            .check(&CREATE_INDEX, &index_args("users"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(
            err.to_string(),
            "pg_create_index requires ENABLE_DANGEROUS=true in environment"
        );
    }

    #[test]
    fn test_authorization_precedes_validation() {
        let err = gate(false)
            .check(&DELETE_DATA, &json!({"schema": "public", "table": "t", "where_clause": ""}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_empty_filter_rejected_when_enabled() {
        let g = gate(true);
        for args in [
            json!({"schema": "public", "table": "t", "where_clause": ""}),
            json!({"schema": "public", "table": "t", "where_clause": "   "}),
            json!({"schema": "public", "table": "t"}),
        ] {
            let err = g.check(&DELETE_DATA, &args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_injection_in_identifier_rejected() {
        let err = gate(true)
            .check(&CREATE_INDEX, &index_args("users; DROP TABLE users"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("table"));
    }

    #[test]
    fn test_defaults_filled_and_strings_trimmed() {
        let args = gate(true)
            .check(&CREATE_INDEX, &index_args("  users  "))
            .unwrap();
        assert_eq!(args["table"], json!("users"));
        assert_eq!(args["unique"], json!(false));
        assert_eq!(args["method"], json!("btree"));
        assert_eq!(args["columns"], json!(["email"]));
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let mut args = index_args("users");
        args["colour"] = json!("red");
        let err = gate(true).check(&CREATE_INDEX, &args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_missing_required_rejected() {
        let err = gate(true)
            .check(&CREATE_INDEX, &json!({"schema": "public"}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut args = index_args("users");
        args["unique"] = json!("maybe");
        assert!(gate(true).check(&CREATE_INDEX, &args).is_err());

        let err = gate(true)
            .check(&QUERY, &json!({"sql": "SELECT 1", "max_rows": [1]}))
            .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let args = gate(false)
            .check(&QUERY, &json!({"sql": "SELECT 1", "max_rows": "50"}))
            .unwrap();
        assert_eq!(args["max_rows"], json!(50));
    }

    #[test]
    fn test_limit_clamped() {
        let args = gate(false)
            .check(&QUERY, &json!({"sql": "SELECT 1", "max_rows": 1_000_000}))
            .unwrap();
        assert_eq!(args["max_rows"], json!(10_000));
    }

    #[test]
    fn test_arguments_must_be_object() {
        assert!(gate(true).check(&QUERY, &json!([1, 2])).is_err());
        assert!(gate(true).check(&LIST_DIR, &Value::Null).is_ok());
    }

    #[test]
    fn test_safe_ignores_switch() {
        assert!(gate(false).check(&LIST_DIR, &json!({})).is_ok());
        assert!(gate(true).check(&LIST_DIR, &json!({})).is_ok());
    }

    #[test]
    fn test_switch_read_each_call() {
        let switch = Arc::new(FixedSwitch::new(false));
        let g = Gate::new(switch.clone(), std::env::temp_dir());
        assert!(g.check(&CREATE_INDEX, &index_args("users")).is_err());
        switch.set(true);
        assert!(g.check(&CREATE_INDEX, &index_args("users")).is_ok());
    }

    #[tokio::test]
    async fn test_admit_checks_paths_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        let g = Gate::new(Arc::new(FixedSwitch::new(false)), dir.path());

        assert!(LIST_DIR.touches_filesystem());
        let args = g.admit(&LIST_DIR, &json!({})).await.unwrap();
        assert_eq!(args["path"], json!("."));

        let err = g
            .admit(&LIST_DIR, &json!({"path": "file.txt"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let err = g
            .admit(&LIST_DIR, &json!({"path": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_admit_inline_without_path_rules() {
        assert!(!QUERY.touches_filesystem());
        let err = gate(false)
            .admit(&CREATE_INDEX, &index_args("users"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let args = gate(false)
            .admit(&QUERY, &json!({"sql": "SELECT 1"}))
            .await
            .unwrap();
        assert_eq!(args["max_rows"], json!(1000));
    }

    proptest! {
        #[test]
        fn prop_valid_identifiers_pass(table in "[A-Za-z_][A-Za-z0-9_]{0,62}") {
            prop_assert!(gate(true).check(&CREATE_INDEX, &index_args(&table)).is_ok());
        }

        #[test]
        fn prop_unsafe_identifiers_fail(
            head in "[a-z]{1,10}",
            bad in prop::sample::select(vec![";", "'", "\"", " x", "\tx", "-"]),
            tail in "[a-z]{0,10}",
        ) {
            let table = format!("{}{}{}", head, bad, tail);
            let err = gate(true).check(&CREATE_INDEX, &index_args(&table)).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Validation);
        }

        #[test]
        fn prop_dangerous_never_passes_when_disabled(table in "[A-Za-z_][A-Za-z0-9_]{0,20}") {
            let err = gate(false).check(&CREATE_INDEX, &index_args(&table)).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Authorization);
        }
    }
}
