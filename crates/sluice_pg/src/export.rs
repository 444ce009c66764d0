//! CSV and SQL renderings of fetched rows.

use serde_json::Value;
use sluice_core::ident::{quote_ident, quote_literal, quote_qualified};

use crate::executor::Row;

fn csv_field(value: &Value) -> String {
    let text = match value {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

/// RFC 4180 CSV with a header row taken from the first row's columns
#[must_use]
pub fn to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let header: Vec<&String> = first.keys().collect();
    let mut out = String::new();
    out.push_str(
        &header
            .iter()
            .map(|name| csv_field(&Value::String((*name).clone())))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push_str("\r\n");
    for row in rows {
        let line: Vec<String> = header
            .iter()
            .map(|name| csv_field(row.get(*name).unwrap_or(&Value::Null)))
            .collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

/// Column definition used by [`backup_sql`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Formatted type, e.g. `character varying(100)`
    pub data_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// Default expression
    pub default: Option<String>,
}

impl ColumnDef {
    /// Read a definition from a catalog row
    #[must_use]
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: row.get("column_name")?.as_str()?.to_string(),
            data_type: row.get("data_type")?.as_str()?.to_string(),
            not_null: row.get("not_null").and_then(Value::as_bool).unwrap_or(false),
            default: row
                .get("column_default")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        other => quote_literal(&other.to_string()),
    }
}

/// `CREATE TABLE` followed by one `INSERT` per row
#[must_use]
pub fn backup_sql(schema: &str, table: &str, columns: &[ColumnDef], rows: &[Row]) -> String {
    let target = quote_qualified(schema, table);
    let defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = format!("  {} {}", quote_ident(&c.name), c.data_type);
            if c.not_null {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default {
                def.push_str(&format!(" DEFAULT {}", default));
            }
            def
        })
        .collect();
    let mut out = format!("CREATE TABLE {} (\n{}\n);\n", target, defs.join(",\n"));

    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|c| sql_literal(row.get(&c.name).unwrap_or(&Value::Null)))
            .collect();
        out.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ({});\n",
            target,
            names.join(", "),
            values.join(", ")
        ));
    }
    out
}
