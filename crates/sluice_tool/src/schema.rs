//! JSON schema rendering of operation descriptors for `tools/list`.

use serde::Serialize;
use serde_json::{json, Map, Value};
use sluice_policy::{OperationSpec, ParamSpec, ParamType, PathKind, Rule};

/// Catalog entry as exposed to MCP clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescription {
    /// Operation name
    pub name: String,
    /// Summary plus danger note
    pub description: String,
    /// JSON schema of the arguments
    pub input_schema: Value,
    /// Behaviour hints
    pub annotations: Value,
}

impl ToolDescription {
    /// Render a descriptor
    #[must_use]
    pub fn from_spec(spec: &OperationSpec) -> Self {
        let description = if spec.is_dangerous() {
            format!(
                "{} (dangerous: requires ENABLE_DANGEROUS=true)",
                spec.summary
            )
        } else {
            spec.summary.to_string()
        };
        Self {
            name: spec.name.to_string(),
            description,
            input_schema: input_schema(spec),
            annotations: json!({
                "destructiveHint": spec.is_dangerous(),
                "readOnlyHint": !spec.is_dangerous(),
            }),
        }
    }
}

/// JSON schema (draft 2020-12 subset) for an operation's arguments
#[must_use]
pub fn input_schema(spec: &OperationSpec) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in spec.params {
        properties.insert(param.name.to_string(), param_schema(spec, param));
        if param.required {
            required.push(Value::from(param.name));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn param_schema(spec: &OperationSpec, param: &ParamSpec) -> Value {
    let mut schema = Map::new();
    if let Some(ty) = param.kind.json_type() {
        schema.insert("type".into(), Value::from(ty));
    }
    match param.kind {
        ParamType::Identifier => {
            schema.insert("pattern".into(), Value::from("^[A-Za-z_][A-Za-z0-9_]*$"));
            schema.insert("maxLength".into(), Value::from(63));
        }
        ParamType::IdentifierList => {
            schema.insert(
                "description".into(),
                Value::from("comma-separated identifiers"),
            );
        }
        ParamType::Array => {
            schema.insert("items".into(), json!({}));
        }
        _ => {}
    }
    if let Some(default) = param.default {
        schema.insert("default".into(), default.to_json());
    }

    for rule in spec.rules {
        match *rule {
            Rule::OneOf { param: p, allowed } if p == param.name => {
                schema.insert("enum".into(), Value::from(allowed.to_vec()));
            }
            Rule::ClampLimit { param: p, max } if p == param.name => {
                schema.insert("maximum".into(), Value::from(max));
            }
            Rule::Positive(p) if p == param.name => {
                schema.insert("minimum".into(), Value::from(1));
            }
            Rule::PathIs { param: p, kind } if p == param.name => {
                let note = match kind {
                    PathKind::Any => "existing path",
                    PathKind::File => "existing file",
                    PathKind::Dir => "existing directory",
                };
                schema.insert("format".into(), Value::from(note));
            }
            _ => {}
        }
    }

    if !param.description.is_empty() {
        schema.insert("description".into(), Value::from(param.description));
    }
    Value::Object(schema)
}
