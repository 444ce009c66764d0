//! Statement builders for the mutating SQL tools.
//!
//! Every name reaching these functions has already passed identifier
//! validation; it is still double-quoted here. Free-form fragments
//! (column definitions, alterations, filters) go through [`fragment`].

use sluice_core::ident::{quote_ident, quote_literal, quote_qualified};
use sluice_core::{ToolError, ToolResult};

/// Accept a caller-written SQL fragment if it cannot end the statement.
///
/// `;` is allowed only inside `'...'` literals and `"..."` identifiers.
/// Comments, dollar quoting and backslashes inside literals are refused so
/// the scan and the server always agree on where a literal ends.
///
/// # Errors
///
/// Returns a validation error for a blank fragment, a `;` outside quotes,
/// an unterminated quote, or any of the refused constructs.
pub fn fragment<'a>(param: &str, text: &'a str) -> ToolResult<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(param, "must not be empty"));
    }
    scan_fragment(trimmed).map_err(|reason| ToolError::validation(param, reason))?;
    Ok(trimmed)
}

fn scan_fragment(text: &str) -> Result<(), &'static str> {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => loop {
                match chars.next() {
                    None => return Err("has an unterminated quote"),
                    Some('\\') if c == '\'' => {
                        return Err("must not use backslash escapes inside literals");
                    }
                    Some(q) if q == c => {
                        if chars.peek() == Some(&c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    Some(_) => {}
                }
            },
            ';' => return Err("must be a single SQL fragment without ';' outside quotes"),
            '$' => return Err("must not use dollar quoting or parameters"),
            '-' if chars.peek() == Some(&'-') => return Err("must not contain comments"),
            '/' if chars.peek() == Some(&'*') => return Err("must not contain comments"),
            _ => {}
        }
    }
    Ok(())
}

fn cascade(on: bool) -> &'static str {
    if on { " CASCADE" } else { "" }
}

/// `CREATE DATABASE`
#[must_use]
pub fn create_database(database: &str, owner: Option<&str>, encoding: &str) -> String {
    let mut sql = format!("CREATE DATABASE {}", quote_ident(database));
    if let Some(owner) = owner {
        sql.push_str(&format!(" OWNER {}", quote_ident(owner)));
    }
    sql.push_str(&format!(" ENCODING {}", quote_literal(encoding)));
    sql
}

/// `DROP DATABASE`
#[must_use]
pub fn drop_database(database: &str) -> String {
    format!("DROP DATABASE {}", quote_ident(database))
}

/// Terminate every other backend connected to `$1`
pub const TERMINATE_DATABASE_BACKENDS: &str = "SELECT pg_terminate_backend(pid) \
     FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()";

/// `CREATE SCHEMA`
#[must_use]
pub fn create_schema(schema: &str, authorization: Option<&str>) -> String {
    match authorization {
        Some(role) => format!(
            "CREATE SCHEMA {} AUTHORIZATION {}",
            quote_ident(schema),
            quote_ident(role)
        ),
        None => format!("CREATE SCHEMA {}", quote_ident(schema)),
    }
}

/// `DROP SCHEMA`
#[must_use]
pub fn drop_schema(schema: &str, cascade_on: bool) -> String {
    format!("DROP SCHEMA {}{}", quote_ident(schema), cascade(cascade_on))
}

/// `CREATE TABLE` from a column definition list
#[must_use]
pub fn create_table(schema: &str, table: &str, columns: &str) -> String {
    format!("CREATE TABLE {} ({})", quote_qualified(schema, table), columns)
}

/// `DROP TABLE`
#[must_use]
pub fn drop_table(schema: &str, table: &str, cascade_on: bool) -> String {
    format!(
        "DROP TABLE {}{}",
        quote_qualified(schema, table),
        cascade(cascade_on)
    )
}

/// `ALTER TABLE`
#[must_use]
pub fn alter_table(schema: &str, table: &str, alteration: &str) -> String {
    format!("ALTER TABLE {} {}", quote_qualified(schema, table), alteration)
}

/// `TRUNCATE TABLE`
#[must_use]
pub fn truncate_table(schema: &str, table: &str, cascade_on: bool, restart_identity: bool) -> String {
    let mut sql = format!("TRUNCATE TABLE {}", quote_qualified(schema, table));
    if restart_identity {
        sql.push_str(" RESTART IDENTITY");
    }
    sql.push_str(cascade(cascade_on));
    sql
}

/// `CREATE INDEX`
#[must_use]
pub fn create_index(
    schema: &str,
    table: &str,
    index: &str,
    columns: &[String],
    unique: bool,
    method: &str,
) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} USING {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote_ident(index),
        quote_qualified(schema, table),
        method,
        cols.join(", ")
    )
}

/// `DROP INDEX`
#[must_use]
pub fn drop_index(schema: &str, index: &str, cascade_on: bool) -> String {
    format!(
        "DROP INDEX {}{}",
        quote_qualified(schema, index),
        cascade(cascade_on)
    )
}

/// What `REINDEX` rebuilds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexTarget<'a> {
    /// Every index of a table
    Table(&'a str),
    /// One index
    Index(&'a str),
}

/// `REINDEX`
#[must_use]
pub fn reindex(schema: &str, target: ReindexTarget<'_>) -> String {
    match target {
        ReindexTarget::Table(t) => format!("REINDEX TABLE {}", quote_qualified(schema, t)),
        ReindexTarget::Index(i) => format!("REINDEX INDEX {}", quote_qualified(schema, i)),
    }
}

/// Role attributes; `None` leaves an attribute untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleOptions {
    /// SUPERUSER / NOSUPERUSER
    pub superuser: Option<bool>,
    /// CREATEDB / NOCREATEDB
    pub createdb: Option<bool>,
    /// CREATEROLE / NOCREATEROLE
    pub createrole: Option<bool>,
    /// LOGIN / NOLOGIN
    pub login: Option<bool>,
}

impl RoleOptions {
    fn clauses(&self) -> Vec<&'static str> {
        let pick = |flag: Option<bool>, on: &'static str, off: &'static str| {
            flag.map(|f| if f { on } else { off })
        };
        [
            pick(self.superuser, "SUPERUSER", "NOSUPERUSER"),
            pick(self.createdb, "CREATEDB", "NOCREATEDB"),
            pick(self.createrole, "CREATEROLE", "NOCREATEROLE"),
            pick(self.login, "LOGIN", "NOLOGIN"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Whether no attribute is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty()
    }
}

fn role_statement(verb: &str, username: &str, password: Option<&str>, options: RoleOptions) -> String {
    let mut clauses: Vec<String> = options.clauses().into_iter().map(String::from).collect();
    if let Some(password) = password {
        clauses.push(format!("PASSWORD {}", quote_literal(password)));
    }
    format!("{} {} WITH {}", verb, quote_ident(username), clauses.join(" "))
}

/// `CREATE USER`; the password is embedded as an escaped literal
#[must_use]
pub fn create_user(username: &str, password: &str, options: RoleOptions) -> String {
    role_statement("CREATE USER", username, Some(password), options)
}

/// `ALTER USER`
#[must_use]
pub fn alter_user(username: &str, password: Option<&str>, options: RoleOptions) -> String {
    role_statement("ALTER USER", username, password, options)
}

/// `DROP USER`
#[must_use]
pub fn drop_user(username: &str) -> String {
    format!("DROP USER {}", quote_ident(username))
}

fn privilege_object(schema: &str, table: Option<&str>) -> String {
    match table {
        Some(t) => format!("TABLE {}", quote_qualified(schema, t)),
        None => format!("ALL TABLES IN SCHEMA {}", quote_ident(schema)),
    }
}

/// `GRANT`; `privileges` is an already normalized keyword list
#[must_use]
pub fn grant(privileges: &str, schema: &str, table: Option<&str>, username: &str) -> String {
    format!(
        "GRANT {} ON {} TO {}",
        privileges,
        privilege_object(schema, table),
        quote_ident(username)
    )
}

/// `REVOKE`
#[must_use]
pub fn revoke(privileges: &str, schema: &str, table: Option<&str>, username: &str) -> String {
    format!(
        "REVOKE {} ON {} FROM {}",
        privileges,
        privilege_object(schema, table),
        quote_ident(username)
    )
}

/// `VACUUM`
#[must_use]
pub fn vacuum(schema: &str, table: &str, full: bool, analyze: bool) -> String {
    let options: Vec<&str> = [(full, "FULL"), (analyze, "ANALYZE")]
        .into_iter()
        .filter_map(|(on, word)| on.then_some(word))
        .collect();
    if options.is_empty() {
        format!("VACUUM {}", quote_qualified(schema, table))
    } else {
        format!(
            "VACUUM ({}) {}",
            options.join(", "),
            quote_qualified(schema, table)
        )
    }
}

/// `ANALYZE`
#[must_use]
pub fn analyze(schema: &str, table: &str) -> String {
    format!("ANALYZE {}", quote_qualified(schema, table))
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT` of the JSON array of objects bound as `$1`
#[must_use]
pub fn insert_rows(schema: &str, table: &str, columns: &[String]) -> String {
    let target = quote_qualified(schema, table);
    let cols = column_list(columns);
    format!(
        "INSERT INTO {target} ({cols}) SELECT {cols} FROM jsonb_populate_recordset(NULL::{target}, $1::jsonb)"
    )
}

/// `UPDATE` setting `columns` from the JSON object bound as `$1`
#[must_use]
pub fn update_rows(schema: &str, table: &str, columns: &[String], filter: Option<&str>) -> String {
    let target = quote_qualified(schema, table);
    let cols = column_list(columns);
    let mut sql = format!(
        "UPDATE {target} SET ({cols}) = (SELECT {cols} FROM jsonb_populate_record(NULL::{target}, $1::jsonb))"
    );
    if let Some(filter) = filter {
        sql.push_str(&format!(" WHERE {}", filter));
    }
    sql
}

/// `DELETE` with a mandatory filter
#[must_use]
pub fn delete_rows(schema: &str, table: &str, filter: &str) -> String {
    format!("DELETE FROM {} WHERE {}", quote_qualified(schema, table), filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::ErrorKind;

    #[test]
    fn test_fragment() {
        assert_eq!(fragment("columns", "  id int  ").unwrap(), "id int");
        assert_eq!(
            fragment("columns", "id int); DROP TABLE x; --").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert!(fragment("columns", "   ").is_err());
    }

    #[test]
    fn test_fragment_semicolon_inside_quotes() {
        assert_eq!(
            fragment("where_clause", "name = 'a;b'").unwrap(),
            "name = 'a;b'"
        );
        assert!(fragment("where_clause", "\"odd;col\" = 1").is_ok());
        assert!(fragment("where_clause", "note = 'it''s; fine'").is_ok());
        assert!(fragment("where_clause", "name = 'a'; DROP TABLE t").is_err());
        assert!(fragment("where_clause", "note = 'it''s'; DROP TABLE t").is_err());
    }

    #[test]
    fn test_fragment_refuses_ambiguous_constructs() {
        for text in [
            "name = 'unterminated",
            "\"open = 1",
            "name = E'\\'; DROP TABLE t; --'",
            "body = $$;$$",
            "id = 1 -- trailing",
            "id = 1 /* note */",
        ] {
            let err = fragment("where_clause", text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", text);
        }
        assert!(fragment("where_clause", "a - -1 = b").is_ok());
        assert!(fragment("columns", "price numeric DEFAULT '$5'").is_ok());
    }

    #[test]
    fn test_database_statements() {
        assert_eq!(
            create_database("shop", Some("app"), "UTF8"),
            "CREATE DATABASE \"shop\" OWNER \"app\" ENCODING 'UTF8'"
        );
        assert_eq!(drop_database("shop"), "DROP DATABASE \"shop\"");
    }

    #[test]
    fn test_table_statements() {
        assert_eq!(
            truncate_table("public", "orders", true, true),
            "TRUNCATE TABLE \"public\".\"orders\" RESTART IDENTITY CASCADE"
        );
        assert_eq!(
            drop_table("public", "orders", false),
            "DROP TABLE \"public\".\"orders\""
        );
    }

    #[test]
    fn test_create_index() {
        let cols = vec!["email".to_string(), "created_at".to_string()];
        assert_eq!(
            create_index("public", "users", "users_email_idx", &cols, true, "btree"),
            "CREATE UNIQUE INDEX \"users_email_idx\" ON \"public\".\"users\" USING btree (\"email\", \"created_at\")"
        );
    }

    #[test]
    fn test_role_statements_escape_password() {
        let sql = create_user(
            "app",
            "it's",
            RoleOptions {
                superuser: Some(false),
                createdb: Some(true),
                createrole: Some(false),
                login: Some(true),
            },
        );
        assert_eq!(
            sql,
            "CREATE USER \"app\" WITH NOSUPERUSER CREATEDB NOCREATEROLE LOGIN PASSWORD 'it''s'"
        );
        let sql = alter_user(
            "app",
            None,
            RoleOptions {
                login: Some(false),
                ..RoleOptions::default()
            },
        );
        assert_eq!(sql, "ALTER USER \"app\" WITH NOLOGIN");
        assert!(RoleOptions::default().is_empty());
    }

    #[test]
    fn test_privilege_statements() {
        assert_eq!(
            grant("SELECT, INSERT", "public", None, "app"),
            "GRANT SELECT, INSERT ON ALL TABLES IN SCHEMA \"public\" TO \"app\""
        );
        assert_eq!(
            revoke("ALL", "public", Some("orders"), "app"),
            "REVOKE ALL ON TABLE \"public\".\"orders\" FROM \"app\""
        );
    }

    #[test]
    fn test_vacuum_options() {
        assert_eq!(
            vacuum("public", "t", false, true),
            "VACUUM (ANALYZE) \"public\".\"t\""
        );
        assert_eq!(vacuum("public", "t", false, false), "VACUUM \"public\".\"t\"");
        assert_eq!(
            vacuum("public", "t", true, true),
            "VACUUM (FULL, ANALYZE) \"public\".\"t\""
        );
    }

    #[test]
    fn test_dml_statements() {
        let cols = vec!["name".to_string(), "age".to_string()];
        assert_eq!(
            insert_rows("public", "people", &cols),
            "INSERT INTO \"public\".\"people\" (\"name\", \"age\") SELECT \"name\", \"age\" \
             FROM jsonb_populate_recordset(NULL::\"public\".\"people\", $1::jsonb)"
        );
        assert!(update_rows("public", "people", &cols, Some("id = 1")).ends_with(" WHERE id = 1"));
        assert_eq!(
            delete_rows("public", "people", "id = 1"),
            "DELETE FROM \"public\".\"people\" WHERE id = 1"
        );
    }
}
