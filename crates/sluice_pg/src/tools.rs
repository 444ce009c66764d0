//! PostgreSQL tool family.
//!
//! Catalog reads bind every caller value as a parameter. Mutations build
//! their statement from quoted identifiers (see [`crate::ddl`]); the only
//! free-form SQL accepted is `pg_query`, `pg_explain_query` and
//! `pg_execute_sql`, plus single-statement fragments.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sluice_core::ident::{identifier_problem, quote_qualified};
use sluice_core::limit::truncate_items;
use sluice_core::{confirmation, Payload, ToolError, ToolResult};
use sluice_policy::sql_guard::strip_terminator;
use sluice_policy::OperationSpec;
use sluice_tool::{unknown_operation, Args, ToolSet};
use std::sync::Arc;

use crate::catalog;
use crate::ddl::{self, fragment, ReindexTarget, RoleOptions};
use crate::executor::{Row, SqlExecutor, SqlParam};
use crate::export::{backup_sql, to_csv, ColumnDef};
use crate::ops::{FAMILY, OPERATIONS};

fn rows_payload(rows: Vec<Row>) -> Payload {
    json!({ "count": rows.len(), "rows": rows })
}

fn text(value: &str) -> SqlParam {
    SqlParam::Text(value.to_string())
}

fn single_statement(param: &str, sql: &str) -> ToolResult<String> {
    let body = strip_terminator(sql);
    if body.is_empty() {
        return Err(ToolError::validation(param, "SQL is required"));
    }
    if body.contains(';') {
        return Err(ToolError::validation(param, "multiple statements are not allowed"));
    }
    Ok(body.to_string())
}

/// Statements PostgreSQL refuses inside a transaction block
fn needs_autocommit(sql: &str) -> bool {
    let words: Vec<String> = sql
        .split_whitespace()
        .take(2)
        .map(str::to_ascii_uppercase)
        .collect();
    matches!(
        words.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
        ["CREATE" | "DROP", "DATABASE"] | ["VACUUM", ..] | ["CREATE" | "DROP", "TABLESPACE"]
    )
}

/// Rows for `pg_insert_data`: one flat row, or an array of rows
fn rows_for_insert(columns: &[String], values: &[Value]) -> ToolResult<Vec<Value>> {
    if values.is_empty() {
        return Err(ToolError::validation("values", "at least one row is required"));
    }
    let nested = values.iter().filter(|v| v.is_array()).count();
    let rows: Vec<&[Value]> = if nested == 0 {
        vec![values]
    } else if nested == values.len() {
        values
            .iter()
            .filter_map(|v| v.as_array().map(Vec::as_slice))
            .collect()
    } else {
        return Err(ToolError::validation(
            "values",
            "pass either one row of values or an array of rows, not a mix",
        ));
    };

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != columns.len() {
                return Err(ToolError::validation(
                    "values",
                    format!(
                        "row {} has {} values for {} columns",
                        i + 1,
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            let object: Map<String, Value> = columns.iter().cloned().zip(row.iter().cloned()).collect();
            Ok(Value::Object(object))
        })
        .collect()
}

/// PostgreSQL tools over a [`SqlExecutor`]
pub struct PgTools {
    exec: Arc<dyn SqlExecutor>,
    database: String,
}

impl PgTools {
    /// Tools for the database the executor is connected to
    #[must_use]
    pub fn new(exec: Arc<dyn SqlExecutor>, database: impl Into<String>) -> Self {
        Self {
            exec,
            database: database.into(),
        }
    }

    async fn rows(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Payload> {
        Ok(rows_payload(self.exec.fetch_rows(sql, params).await?))
    }

    async fn first_row(&self, sql: &str, params: &[SqlParam], kind: &str, id: &str) -> ToolResult<Payload> {
        self.exec
            .fetch_rows(sql, params)
            .await?
            .into_iter()
            .next()
            .map(Value::Object)
            .ok_or_else(|| ToolError::not_found(kind, id))
    }

    async fn ddl(&self, sql: String, done: String) -> ToolResult<Payload> {
        tracing::debug!(sql = %sql, "executing statement");
        if needs_autocommit(&sql) {
            self.exec.execute_script(&sql).await?;
        } else {
            self.exec.execute(&sql, &[]).await?;
        }
        Ok(confirmation(done))
    }

    fn schema_table<'a>(args: &'a Args) -> ToolResult<(&'a str, &'a str)> {
        Ok((args.str("schema")?, args.str("table")?))
    }

    async fn health(&self) -> ToolResult<Payload> {
        self.exec
            .fetch_rows(catalog::HEALTH, &[])
            .await?
            .into_iter()
            .next()
            .map(Value::Object)
            .ok_or_else(|| ToolError::upstream("postgres", "health query returned no rows"))
    }

    async fn describe_table(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let columns = self
            .exec
            .fetch_rows(catalog::DESCRIBE_TABLE, &[text(schema), text(table)])
            .await?;
        if columns.is_empty() {
            return Err(ToolError::not_found("table", format!("{}.{}", schema, table)));
        }
        Ok(json!({
            "schema": schema,
            "table": table,
            "count": columns.len(),
            "columns": columns,
        }))
    }

    async fn in_schema(&self, sql: &str, args: &Args) -> ToolResult<Payload> {
        self.rows(sql, &[text(args.str("schema")?)]).await
    }

    async fn on_table(&self, sql: &str, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        self.rows(sql, &[text(schema), text(table)]).await
    }

    async fn database_stats(&self, args: &Args) -> ToolResult<Payload> {
        let database = args.opt_str("database").unwrap_or(&self.database);
        self.first_row(catalog::DATABASE_STATS, &[text(database)], "database", database)
            .await
    }

    async fn create_database(&self, args: &Args) -> ToolResult<Payload> {
        let database = args.str("database")?;
        let sql = ddl::create_database(database, args.opt_str("owner"), args.str("encoding")?);
        self.ddl(sql, format!("database {} created", database)).await
    }

    async fn drop_database(&self, args: &Args) -> ToolResult<Payload> {
        let database = args.str("database")?;
        if database == self.database {
            return Err(ToolError::conflict(format!(
                "cannot drop {}: it is the database this server is connected to",
                database
            )));
        }
        if args.flag("force") {
            let terminated = self
                .exec
                .execute(ddl::TERMINATE_DATABASE_BACKENDS, &[text(database)])
                .await?;
            tracing::info!(database, terminated, "terminated connections before drop");
        }
        self.ddl(ddl::drop_database(database), format!("database {} dropped", database))
            .await
    }

    async fn table_size(&self, args: &Args) -> ToolResult<Payload> {
        let schema = args.str("schema")?;
        match args.opt_str("table") {
            Some(table) => {
                self.first_row(
                    &catalog::table_size(),
                    &[text(schema), text(table)],
                    "table",
                    &format!("{}.{}", schema, table),
                )
                .await
            }
            None => self.rows(&catalog::table_sizes(), &[text(schema)]).await,
        }
    }

    async fn table_stats(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        self.first_row(
            catalog::TABLE_STATS,
            &[text(schema), text(table)],
            "table",
            &format!("{}.{}", schema, table),
        )
        .await
    }

    async fn list_indexes(&self, args: &Args) -> ToolResult<Payload> {
        match args.opt_str("table") {
            Some(_) => self.on_table(catalog::LIST_TABLE_INDEXES, args).await,
            None => self.in_schema(catalog::LIST_INDEXES, args).await,
        }
    }

    async fn create_table(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let columns = fragment("columns", args.str("columns")?)?;
        self.ddl(
            ddl::create_table(schema, table, columns),
            format!("table {}.{} created", schema, table),
        )
        .await
    }

    async fn alter_table(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let alteration = fragment("alteration", args.str("alteration")?)?;
        self.ddl(
            ddl::alter_table(schema, table, alteration),
            format!("table {}.{} altered", schema, table),
        )
        .await
    }

    async fn create_index(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let index = args.str("index_name")?;
        let columns = args.strings("columns")?;
        if columns.is_empty() {
            return Err(ToolError::validation("columns", "at least one column is required"));
        }
        let sql = ddl::create_index(
            schema,
            table,
            index,
            &columns,
            args.flag("unique"),
            args.str("method")?,
        );
        self.ddl(sql, format!("index {} created on {}.{}", index, schema, table))
            .await
    }

    async fn reindex(&self, args: &Args) -> ToolResult<Payload> {
        let schema = args.str("schema")?;
        let (target, done) = match (args.opt_str("index"), args.opt_str("table")) {
            (Some(index), _) => (ReindexTarget::Index(index), format!("index {} rebuilt", index)),
            (None, Some(table)) => (
                ReindexTarget::Table(table),
                format!("indexes of {}.{} rebuilt", schema, table),
            ),
            (None, None) => {
                return Err(ToolError::validation("table|index", "at least one of table, index is required"));
            }
        };
        self.ddl(ddl::reindex(schema, target), done).await
    }

    async fn create_user(&self, args: &Args) -> ToolResult<Payload> {
        let username = args.str("username")?;
        let options = RoleOptions {
            superuser: Some(args.flag("superuser")),
            createdb: Some(args.flag("createdb")),
            createrole: Some(args.flag("createrole")),
            login: args.opt_bool("login"),
        };
        let sql = ddl::create_user(username, args.str("password")?, options);
        self.exec.execute(&sql, &[]).await?;
        Ok(confirmation(format!("user {} created", username)))
    }

    async fn alter_user(&self, args: &Args) -> ToolResult<Payload> {
        let username = args.str("username")?;
        let options = RoleOptions {
            superuser: args.opt_bool("superuser"),
            createdb: args.opt_bool("createdb"),
            createrole: args.opt_bool("createrole"),
            login: args.opt_bool("login"),
        };
        let password = args.opt_str("password");
        if password.is_none() && options.is_empty() {
            return Err(ToolError::validation(
                "username",
                "nothing to change; pass a password or a role attribute",
            ));
        }
        let sql = ddl::alter_user(username, password, options);
        self.exec.execute(&sql, &[]).await?;
        Ok(confirmation(format!("user {} altered", username)))
    }

    async fn privileges(&self, args: &Args, grant: bool) -> ToolResult<Payload> {
        let username = args.str("username")?;
        let privileges = args.str("privileges")?;
        let schema = args.str("schema")?;
        let table = args.opt_str("table");
        let on = match table {
            Some(t) => format!("{}.{}", schema, t),
            None => format!("all tables in schema {}", schema),
        };
        if grant {
            self.ddl(
                ddl::grant(privileges, schema, table, username),
                format!("granted {} on {} to {}", privileges, on, username),
            )
            .await
        } else {
            self.ddl(
                ddl::revoke(privileges, schema, table, username),
                format!("revoked {} on {} from {}", privileges, on, username),
            )
            .await
        }
    }

    async fn signal_backend(&self, args: &Args, sql: &str, done: &str) -> ToolResult<Payload> {
        let pid = args.int("pid")?;
        let rows = self.exec.fetch_rows(sql, &[SqlParam::Int(pid)]).await?;
        let signalled = rows
            .first()
            .and_then(|row| row.get("done"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !signalled {
            return Err(ToolError::not_found("backend", pid.to_string()));
        }
        Ok(confirmation(format!("{} {}", done, pid)))
    }

    async fn vacuum_table(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let sql = ddl::vacuum(schema, table, args.flag("full"), args.flag("analyze"));
        self.ddl(sql, format!("table {}.{} vacuumed", schema, table))
            .await
    }

    async fn analyze_table(&self, args: &Args) -> ToolResult<Payload> {
        let schema = args.str("schema")?;
        if let Some(table) = args.opt_str("table") {
            return self
                .ddl(
                    ddl::analyze(schema, table),
                    format!("table {}.{} analyzed", schema, table),
                )
                .await;
        }
        let tables = self
            .exec
            .fetch_rows(catalog::LIST_TABLES, &[text(schema)])
            .await?;
        let mut analyzed = Vec::new();
        for row in &tables {
            let Some(table) = row.get("table").and_then(Value::as_str) else {
                continue;
            };
            self.exec.execute(&ddl::analyze(schema, table), &[]).await?;
            analyzed.push(table.to_string());
        }
        Ok(json!({ "schema": schema, "count": analyzed.len(), "tables": analyzed }))
    }

    async fn insert_data(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let columns = args.strings("columns")?;
        if columns.is_empty() {
            return Err(ToolError::validation("columns", "at least one column is required"));
        }
        let rows = rows_for_insert(&columns, args.array("values")?)?;
        let inserted = self
            .exec
            .execute(
                &ddl::insert_rows(schema, table, &columns),
                &[SqlParam::Json(Value::Array(rows))],
            )
            .await?;
        Ok(json!({ "schema": schema, "table": table, "rows_inserted": inserted }))
    }

    async fn update_data(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let values = args.object("values")?;
        if values.is_empty() {
            return Err(ToolError::validation("values", "at least one column is required"));
        }
        for column in values.keys() {
            if let Some(problem) = identifier_problem(column) {
                return Err(ToolError::validation(
                    "values",
                    format!("column {:?}: {}", column, problem),
                ));
            }
        }
        let filter = args
            .opt_str("where_clause")
            .map(|f| fragment("where_clause", f))
            .transpose()?;
        let columns: Vec<String> = values.keys().cloned().collect();
        let updated = self
            .exec
            .execute(
                &ddl::update_rows(schema, table, &columns, filter),
                &[SqlParam::Json(Value::Object(values.clone()))],
            )
            .await?;
        Ok(json!({ "schema": schema, "table": table, "rows_updated": updated }))
    }

    async fn delete_data(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let filter = fragment("where_clause", args.str("where_clause")?)?;
        let deleted = self
            .exec
            .execute(&ddl::delete_rows(schema, table, filter), &[])
            .await?;
        Ok(json!({ "schema": schema, "table": table, "rows_deleted": deleted }))
    }

    async fn query(&self, args: &Args) -> ToolResult<Payload> {
        let sql = single_statement("sql", args.str("sql")?)?;
        let max_rows = args.count("max_rows")?;
        let limited = format!("SELECT * FROM ({}\n) AS limited LIMIT {}", sql, max_rows + 1);
        let rows = self.exec.fetch_rows_read_only(&limited, &[]).await?;
        let (rows, truncated) = truncate_items(rows, max_rows);
        Ok(json!({
            "count": rows.len(),
            "rows": rows,
            "truncated": truncated,
            "max_rows": max_rows,
        }))
    }

    async fn execute_sql(&self, args: &Args) -> ToolResult<Payload> {
        let sql = strip_terminator(args.str("sql")?);
        if sql.is_empty() {
            return Err(ToolError::validation("sql", "SQL is required"));
        }
        tracing::info!(sql = %sql, "executing caller SQL");
        let affected = if sql.contains(';') || needs_autocommit(sql) {
            self.exec.execute_script(sql).await?
        } else {
            self.exec.execute(sql, &[]).await?
        };
        Ok(json!({ "rows_affected": affected }))
    }

    async fn explain_query(&self, args: &Args) -> ToolResult<Payload> {
        let sql = single_statement("sql", args.str("sql")?)?;
        let analyze = args.flag("analyze");
        let explain = format!(
            "EXPLAIN (FORMAT JSON, ANALYZE {a}, BUFFERS {a}, VERBOSE) {sql}",
            a = analyze
        );
        let plan = self.exec.fetch_value_read_only(&explain, &[]).await?;
        Ok(json!({ "analyzed": analyze, "plan": plan }))
    }

    async fn table_rows(&self, schema: &str, table: &str, limit: usize) -> ToolResult<(Vec<Row>, bool)> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_qualified(schema, table),
            limit + 1
        );
        let rows = self.exec.fetch_rows(&sql, &[]).await?;
        Ok(truncate_items(rows, limit))
    }

    async fn export_table_csv(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let (rows, truncated) = self.table_rows(schema, table, args.count("limit")?).await?;
        Ok(json!({
            "schema": schema,
            "table": table,
            "csv": to_csv(&rows),
            "rows": rows.len(),
            "truncated": truncated,
        }))
    }

    async fn backup_table_sql(&self, args: &Args) -> ToolResult<Payload> {
        let (schema, table) = Self::schema_table(args)?;
        let columns: Vec<ColumnDef> = self
            .exec
            .fetch_rows(catalog::TABLE_COLUMNS_DDL, &[text(schema), text(table)])
            .await?
            .iter()
            .filter_map(ColumnDef::from_row)
            .collect();
        if columns.is_empty() {
            return Err(ToolError::not_found("table", format!("{}.{}", schema, table)));
        }
        let (rows, truncated) = self
            .table_rows(schema, table, args.count("max_rows")?)
            .await?;
        Ok(json!({
            "schema": schema,
            "table": table,
            "sql": backup_sql(schema, table, &columns, &rows),
            "rows": rows.len(),
            "truncated": truncated,
        }))
    }

    async fn server_settings(&self, args: &Args) -> ToolResult<Payload> {
        match args.opt_str("pattern") {
            Some(pattern) => self.rows(catalog::SETTINGS_MATCHING, &[text(pattern)]).await,
            None => self.rows(catalog::SETTINGS_ALL, &[]).await,
        }
    }

    async fn activity_summary(&self) -> ToolResult<Payload> {
        let mut summary = self
            .first_row(catalog::ACTIVITY_SUMMARY, &[], "database", &self.database)
            .await?;
        summary["database"] = json!(self.database);
        Ok(summary)
    }
}

#[async_trait]
impl ToolSet for PgTools {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn operations(&self) -> &'static [OperationSpec] {
        OPERATIONS
    }

    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload> {
        let a = &args;
        match operation {
            "pg_health" => self.health().await,
            "pg_list_schemas" => self.rows(catalog::LIST_SCHEMAS, &[]).await,
            "pg_list_tables" => self.in_schema(catalog::LIST_TABLES, a).await,
            "pg_describe_table" => self.describe_table(a).await,
            "pg_show_setting" => {
                let name = a.str("name")?;
                self.first_row(catalog::SHOW_SETTING, &[text(name)], "setting", name)
                    .await
            }
            "pg_list_views" => self.in_schema(catalog::LIST_VIEWS, a).await,
            "pg_view_definition" => {
                let (schema, view) = (a.str("schema")?, a.str("view")?);
                self.first_row(
                    catalog::VIEW_DEFINITION,
                    &[text(schema), text(view)],
                    "view",
                    &format!("{}.{}", schema, view),
                )
                .await
            }
            "pg_list_functions" => self.in_schema(catalog::LIST_FUNCTIONS, a).await,
            "pg_table_constraints" => self.on_table(catalog::TABLE_CONSTRAINTS, a).await,
            "pg_foreign_keys" => self.in_schema(catalog::FOREIGN_KEYS, a).await,

            "pg_list_databases" => self.rows(catalog::LIST_DATABASES, &[]).await,
            "pg_database_stats" => self.database_stats(a).await,
            "pg_create_database" => self.create_database(a).await,
            "pg_drop_database" => self.drop_database(a).await,

            "pg_create_schema" => {
                let schema = a.str("schema")?;
                self.ddl(
                    ddl::create_schema(schema, a.opt_str("authorization")),
                    format!("schema {} created", schema),
                )
                .await
            }
            "pg_drop_schema" => {
                let schema = a.str("schema")?;
                self.ddl(
                    ddl::drop_schema(schema, a.flag("cascade")),
                    format!("schema {} dropped", schema),
                )
                .await
            }

            "pg_table_size" => self.table_size(a).await,
            "pg_table_stats" => self.table_stats(a).await,
            "pg_bloat_check" => self.in_schema(catalog::BLOAT_CHECK, a).await,
            "pg_create_table" => self.create_table(a).await,
            "pg_drop_table" => {
                let (schema, table) = Self::schema_table(a)?;
                self.ddl(
                    ddl::drop_table(schema, table, a.flag("cascade")),
                    format!("table {}.{} dropped", schema, table),
                )
                .await
            }
            "pg_alter_table" => self.alter_table(a).await,
            "pg_truncate_table" => {
                let (schema, table) = Self::schema_table(a)?;
                self.ddl(
                    ddl::truncate_table(schema, table, a.flag("cascade"), a.flag("restart_identity")),
                    format!("table {}.{} truncated", schema, table),
                )
                .await
            }

            "pg_list_indexes" => self.list_indexes(a).await,
            "pg_index_usage" => self.in_schema(catalog::INDEX_USAGE, a).await,
            "pg_unused_indexes" => self.in_schema(catalog::UNUSED_INDEXES, a).await,
            "pg_create_index" => self.create_index(a).await,
            "pg_drop_index" => {
                let (schema, index) = (a.str("schema")?, a.str("index_name")?);
                self.ddl(
                    ddl::drop_index(schema, index, a.flag("cascade")),
                    format!("index {}.{} dropped", schema, index),
                )
                .await
            }
            "pg_reindex" => self.reindex(a).await,

            "pg_list_users" => self.rows(catalog::LIST_USERS, &[]).await,
            "pg_user_permissions" => {
                self.rows(catalog::USER_PERMISSIONS, &[text(a.str("username")?)])
                    .await
            }
            "pg_table_permissions" => self.on_table(catalog::TABLE_PERMISSIONS, a).await,
            "pg_create_user" => self.create_user(a).await,
            "pg_alter_user" => self.alter_user(a).await,
            "pg_drop_user" => {
                let username = a.str("username")?;
                self.ddl(ddl::drop_user(username), format!("user {} dropped", username))
                    .await
            }
            "pg_grant_privileges" => self.privileges(a, true).await,
            "pg_revoke_privileges" => self.privileges(a, false).await,

            "pg_active_queries" => {
                self.rows(&catalog::active_queries(a.flag("include_idle")), &[])
                    .await
            }
            "pg_long_running_queries" => {
                let seconds = a.count("min_seconds")?;
                self.rows(catalog::LONG_RUNNING_QUERIES, &[SqlParam::Int(seconds as i64)])
                    .await
            }
            "pg_blocking_queries" => self.rows(catalog::BLOCKING_QUERIES, &[]).await,
            "pg_connection_stats" => self.rows(catalog::CONNECTION_STATS, &[]).await,
            "pg_locks_summary" => self.rows(catalog::LOCKS_SUMMARY, &[]).await,
            "pg_cache_hit_ratio" => self.rows(catalog::CACHE_HIT_RATIO, &[]).await,
            "pg_slowest_queries" => {
                self.rows(catalog::SLOWEST_QUERIES, &[SqlParam::Int(a.int("limit")?)])
                    .await
            }
            "pg_replication_status" => self.rows(catalog::REPLICATION_STATUS, &[]).await,
            "pg_vacuum_stats" => self.rows(catalog::VACUUM_STATS, &[]).await,
            "pg_kill_query" => {
                self.signal_backend(a, catalog::TERMINATE_BACKEND, "terminated backend")
                    .await
            }
            "pg_cancel_query" => {
                self.signal_backend(a, catalog::CANCEL_BACKEND, "cancelled query on backend")
                    .await
            }

            "pg_vacuum_table" => self.vacuum_table(a).await,
            "pg_analyze_table" => self.analyze_table(a).await,

            "pg_insert_data" => self.insert_data(a).await,
            "pg_update_data" => self.update_data(a).await,
            "pg_delete_data" => self.delete_data(a).await,

            "pg_query" => self.query(a).await,
            "pg_execute_sql" => self.execute_sql(a).await,
            "pg_explain_query" => self.explain_query(a).await,

            "pg_export_table_csv" => self.export_table_csv(a).await,
            "pg_backup_table_sql" => self.backup_table_sql(a).await,

            "pg_server_settings" => self.server_settings(a).await,
            "pg_extensions" => self.rows(catalog::EXTENSIONS, &[]).await,
            "pg_tablespaces" => self.rows(catalog::TABLESPACES, &[]).await,
            "pg_database_activity_summary" => self.activity_summary().await,

            other => Err(unknown_operation(FAMILY, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallKind, Canned, RecordingExecutor};
    use proptest::prelude::*;
    use sluice_core::{ErrorKind, FixedSwitch, Outcome, Response};
    use sluice_policy::Gate;
    use sluice_tool::{Dispatcher, InvocationRequest, ToolRegistry};

    struct Fixture {
        exec: Arc<RecordingExecutor>,
        dispatcher: Dispatcher,
    }

    fn fixture(exec: RecordingExecutor, dangerous: bool) -> Fixture {
        let exec = Arc::new(exec);
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(PgTools::new(exec.clone(), "appdb")))
            .unwrap();
        let gate = Gate::new(Arc::new(FixedSwitch::new(dangerous)), std::env::temp_dir());
        Fixture {
            exec,
            dispatcher: Dispatcher::new(Arc::new(registry), gate),
        }
    }

    impl Fixture {
        async fn call(&self, op: &str, args: Value) -> Response {
            self.dispatcher.invoke(InvocationRequest::new(op, args)).await
        }
    }

    fn spec(name: &str) -> &'static OperationSpec {
        OPERATIONS.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_catalog_size() {
        assert_eq!(OPERATIONS.len(), 62);
        assert_eq!(OPERATIONS.iter().filter(|s| s.is_dangerous()).count(), 24);
    }

    #[tokio::test]
    async fn test_every_dangerous_op_blocked_without_switch() {
        let fx = fixture(RecordingExecutor::new(), false);
        for spec in OPERATIONS.iter().filter(|s| s.is_dangerous()) {
            let resp = fx.call(spec.name, json!({})).await;
            assert_eq!(
                resp.error_kind(),
                Some(ErrorKind::Authorization.as_str()),
                "{}",
                spec.name
            );
        }
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_table_blocked_names_switch() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call(
                "pg_create_table",
                json!({"schema": "public", "table": "t", "columns": "id int"}),
            )
            .await;
        assert_eq!(resp.outcome, Outcome::Error);
        assert!(resp.text().contains("ENABLE_DANGEROUS=true"));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_tables_defaults_to_public() {
        let exec = RecordingExecutor::new().with_rows(vec![json!({"table": "users"}), json!({"table": "orders"})]);
        let fx = fixture(exec, false);
        let resp = fx.call("pg_list_tables", json!({})).await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(resp.payload["count"], json!(2));
        assert_eq!(resp.payload["rows"][0]["table"], json!("users"));
        let call = &fx.exec.calls()[0];
        assert_eq!(call.kind, CallKind::Rows);
        assert_eq!(call.params, vec![SqlParam::Text("public".into())]);
    }

    #[tokio::test]
    async fn test_describe_missing_table_is_not_found() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call("pg_describe_table", json!({"schema": "public", "table": "ghost"}))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
        assert!(resp.text().contains("public.ghost"));
    }

    #[tokio::test]
    async fn test_query_rejects_writes_before_executor() {
        let fx = fixture(RecordingExecutor::new(), true);
        for sql in [
            "DELETE FROM users",
            "SELECT 1; DROP TABLE users",
            "SELECT * INTO stolen FROM users",
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity",
            "SELECT pg_cancel_backend(7)",
            "SELECT set_config('search_path', 'evil', false)",
            "SELECT nextval('orders_id_seq')",
            "WITH x AS (/* keep */ InSeRt INTO t VALUES (1) RETURNING *) SELECT * FROM x",
        ] {
            let resp = fx.call("pg_query", json!({"sql": sql})).await;
            assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()), "{}", sql);
        }
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_truncates_to_max_rows() {
        let rows = (0..4).map(|i| json!({"n": i})).collect();
        let fx = fixture(RecordingExecutor::new().with_rows(rows), false);
        let resp = fx
            .call("pg_query", json!({"sql": "SELECT n FROM t;", "max_rows": 3}))
            .await;
        assert_eq!(resp.payload["count"], json!(3));
        assert_eq!(resp.payload["truncated"], json!(true));
        assert_eq!(
            fx.exec.last_sql().unwrap(),
            "SELECT * FROM (SELECT n FROM t\n) AS limited LIMIT 4"
        );
        assert_eq!(fx.exec.calls()[0].kind, CallKind::ReadOnlyRows);
    }

    #[tokio::test]
    async fn test_query_with_trailing_comment() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call("pg_query", json!({"sql": "SELECT id FROM users -- newest first"}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        let sql = fx.exec.last_sql().unwrap();
        assert_eq!(sql.lines().last().unwrap(), ") AS limited LIMIT 1001");
    }

    #[tokio::test]
    async fn test_query_duplicate_columns_surface_as_validation() {
        let exec = RecordingExecutor::new().with(Canned::Error(
            crate::executor::decode_rows(r#"[{"id": 1, "id": 2}]"#).unwrap_err(),
        ));
        let fx = fixture(exec, false);
        let resp = fx
            .call("pg_query", json!({"sql": "SELECT a.id, b.id FROM a JOIN b USING (k)"}))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert!(resp.text().contains("distinct alias"));
    }

    #[tokio::test]
    async fn test_query_max_rows_clamped() {
        let fx = fixture(RecordingExecutor::new(), false);
        fx.call("pg_query", json!({"sql": "SELECT 1", "max_rows": 1_000_000}))
            .await;
        assert!(fx.exec.last_sql().unwrap().ends_with("LIMIT 10001"));
    }

    #[tokio::test]
    async fn test_delete_requires_filter() {
        let fx = fixture(RecordingExecutor::new(), true);
        for args in [
            json!({"schema": "public", "table": "users", "where_clause": ""}),
            json!({"schema": "public", "table": "users", "where_clause": "   "}),
            json!({"schema": "public", "table": "users"}),
        ] {
            let resp = fx.call("pg_delete_data", args).await;
            assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        }
        assert_eq!(fx.exec.call_count(), 0);

        let fx = fixture(RecordingExecutor::new().with(Canned::Affected(2)), true);
        let resp = fx
            .call(
                "pg_delete_data",
                json!({"schema": "public", "table": "users", "where_clause": "id > 10"}),
            )
            .await;
        assert_eq!(resp.payload["rows_deleted"], json!(2));
        assert_eq!(
            fx.exec.last_sql().unwrap(),
            "DELETE FROM \"public\".\"users\" WHERE id > 10"
        );
    }

    #[tokio::test]
    async fn test_filter_semicolon_only_inside_literal() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_delete_data",
                json!({"schema": "public", "table": "tags", "where_clause": "name = 'a;b'"}),
            )
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert!(fx.exec.last_sql().unwrap().ends_with("WHERE name = 'a;b'"));

        let resp = fx
            .call(
                "pg_delete_data",
                json!({"schema": "public", "table": "tags", "where_clause": "name = 'a'; DROP TABLE tags"}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 1);
    }

    #[tokio::test]
    async fn test_create_index_rejects_injected_table() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_create_index",
                json!({
                    "schema": "public",
                    "table": "users; DROP TABLE users",
                    "index_name": "idx",
                    "columns": "email",
                }),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert!(resp.text().contains("table"));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_index_statement() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_create_index",
                json!({
                    "schema": "public",
                    "table": "users",
                    "index_name": "users_email_idx",
                    "columns": "email, created_at",
                    "unique": true,
                    "method": "BTREE",
                }),
            )
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(
            fx.exec.last_sql().unwrap(),
            "CREATE UNIQUE INDEX \"users_email_idx\" ON \"public\".\"users\" USING btree (\"email\", \"created_at\")"
        );
    }

    #[tokio::test]
    async fn test_create_table_fragment_cannot_chain() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_create_table",
                json!({"schema": "public", "table": "t", "columns": "id int); DROP TABLE users; --"}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_connected_database_conflicts() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx.call("pg_drop_database", json!({"database": "appdb"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Conflict.as_str()));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_database_force_terminates_first() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call("pg_drop_database", json!({"database": "scratch", "force": true}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        let calls = fx.exec.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params, vec![SqlParam::Text("scratch".into())]);
        assert_eq!(calls[1].kind, CallKind::Script);
        assert_eq!(calls[1].sql, "DROP DATABASE \"scratch\"");
    }

    #[tokio::test]
    async fn test_drop_system_schema_refused() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx.call("pg_drop_schema", json!({"schema": "pg_catalog"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_kill_unknown_pid_is_not_found() {
        let exec = RecordingExecutor::new().with_rows(vec![json!({"done": false})]);
        let fx = fixture(exec, true);
        let resp = fx.call("pg_kill_query", json!({"pid": 4242})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
        assert!(resp.text().contains("4242"));

        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx.call("pg_cancel_query", json!({"pid": 0})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
    }

    #[tokio::test]
    async fn test_grant_normalizes_privileges() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_grant_privileges",
                json!({"username": "app", "privileges": "select,insert", "schema": "public", "table": "users"}),
            )
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert!(fx.exec.last_sql().unwrap().starts_with("GRANT SELECT, INSERT ON"));

        let resp = fx
            .call(
                "pg_grant_privileges",
                json!({"username": "app", "privileges": "SELECT; DROP", "schema": "public"}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
    }

    #[tokio::test]
    async fn test_alter_user_needs_a_change() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx.call("pg_alter_user", json!({"username": "app"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));

        let resp = fx
            .call("pg_alter_user", json!({"username": "app", "login": false}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(fx.exec.last_sql().unwrap(), "ALTER USER \"app\" WITH NOLOGIN");
    }

    #[tokio::test]
    async fn test_insert_rows_bound_as_json() {
        let fx = fixture(RecordingExecutor::new().with(Canned::Affected(2)), true);
        let resp = fx
            .call(
                "pg_insert_data",
                json!({
                    "schema": "public",
                    "table": "users",
                    "columns": ["name", "age"],
                    "values": [["ada", 36], ["alan", 41]],
                }),
            )
            .await;
        assert_eq!(resp.payload["rows_inserted"], json!(2));
        let call = &fx.exec.calls()[0];
        assert_eq!(
            call.params,
            vec![SqlParam::Json(json!([
                {"name": "ada", "age": 36},
                {"name": "alan", "age": 41}
            ]))]
        );
    }

    #[tokio::test]
    async fn test_insert_arity_mismatch() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_insert_data",
                json!({"schema": "public", "table": "users", "columns": "name, age", "values": ["ada"]}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert!(resp.text().contains("1 values for 2 columns"));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_rejects_bad_column_names() {
        let fx = fixture(RecordingExecutor::new(), true);
        let resp = fx
            .call(
                "pg_update_data",
                json!({"schema": "public", "table": "users", "values": {"name = 'x'--": 1}}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_sql_routes_scripts() {
        let fx = fixture(RecordingExecutor::new().with(Canned::Affected(3)), true);
        let resp = fx
            .call("pg_execute_sql", json!({"sql": "UPDATE t SET a = 1;"}))
            .await;
        assert_eq!(resp.payload["rows_affected"], json!(3));
        assert_eq!(fx.exec.calls()[0].kind, CallKind::Execute);
        assert_eq!(fx.exec.calls()[0].sql, "UPDATE t SET a = 1");

        fx.call("pg_execute_sql", json!({"sql": "CREATE DATABASE x"}))
            .await;
        fx.call("pg_execute_sql", json!({"sql": "SELECT 1; SELECT 2"}))
            .await;
        let calls = fx.exec.calls();
        assert_eq!(calls[1].kind, CallKind::Script);
        assert_eq!(calls[2].kind, CallKind::Script);
    }

    #[tokio::test]
    async fn test_explain_analyze_requires_read_only() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call("pg_explain_query", json!({"sql": "DELETE FROM t", "analyze": true}))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 0);

        let fx = fixture(
            RecordingExecutor::new().with(Canned::Value(json!([{"Plan": {"Node Type": "Seq Scan"}}]))),
            false,
        );
        let resp = fx
            .call("pg_explain_query", json!({"sql": "SELECT * FROM t"}))
            .await;
        assert_eq!(resp.payload["plan"][0]["Plan"]["Node Type"], json!("Seq Scan"));
        assert_eq!(
            fx.exec.last_sql().unwrap(),
            "EXPLAIN (FORMAT JSON, ANALYZE false, BUFFERS false, VERBOSE) SELECT * FROM t"
        );
        assert_eq!(fx.exec.calls()[0].kind, CallKind::ReadOnlyValue);
    }

    #[tokio::test]
    async fn test_explain_analyze_rejects_side_effects() {
        let fx = fixture(RecordingExecutor::new(), false);
        for sql in [
            "SELECT * INTO stolen FROM users",
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity",
            "SELECT set_config('work_mem', '1GB', false)",
            "WITH x AS (InSeRt INTO t VALUES (1) RETURNING *) SELECT * FROM x",
        ] {
            let resp = fx
                .call("pg_explain_query", json!({"sql": sql, "analyze": true}))
                .await;
            assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()), "{}", sql);
        }
        assert_eq!(fx.exec.call_count(), 0);
    }

    #[tokio::test]
    async fn test_explain_without_analyze_plans_writes_read_only() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call("pg_explain_query", json!({"sql": "DELETE FROM t WHERE id = 1"}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(resp.payload["analyzed"], json!(false));
        let call = &fx.exec.calls()[0];
        assert_eq!(call.kind, CallKind::ReadOnlyValue);
        assert!(call.sql.contains("ANALYZE false"));

        let resp = fx
            .call(
                "pg_explain_query",
                json!({"sql": "DELETE FROM t; DROP TABLE t", "analyze": false}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.exec.call_count(), 1);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let exec = RecordingExecutor::new().with_rows(vec![
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b"}),
        ]);
        let fx = fixture(exec, false);
        let resp = fx
            .call("pg_export_table_csv", json!({"schema": "public", "table": "t", "limit": 1}))
            .await;
        assert_eq!(resp.payload["csv"], json!("id,name\r\n1,a\r\n"));
        assert_eq!(resp.payload["truncated"], json!(true));
        assert_eq!(
            fx.exec.last_sql().unwrap(),
            "SELECT * FROM \"public\".\"t\" LIMIT 2"
        );
    }

    #[tokio::test]
    async fn test_backup_missing_table() {
        let fx = fixture(RecordingExecutor::new(), false);
        let resp = fx
            .call("pg_backup_table_sql", json!({"schema": "public", "table": "nope"}))
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
    }

    #[tokio::test]
    async fn test_analyze_every_table() {
        let exec = RecordingExecutor::new().with_rows(vec![json!({"table": "a"}), json!({"table": "b"})]);
        let fx = fixture(exec, true);
        let resp = fx.call("pg_analyze_table", json!({"schema": "public"})).await;
        assert_eq!(resp.payload["count"], json!(2));
        assert_eq!(fx.exec.last_sql().unwrap(), "ANALYZE \"public\".\"b\"");
    }

    #[tokio::test]
    async fn test_upstream_message_preserved() {
        let exec = RecordingExecutor::new().with(Canned::Error(ToolError::upstream(
            "postgres",
            "permission denied for table secrets",
        )));
        let fx = fixture(exec, false);
        let resp = fx.call("pg_list_schemas", json!({})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Upstream.as_str()));
        assert!(resp.text().contains("permission denied for table secrets"));
    }

    proptest! {
        #[test]
        fn prop_non_identifier_table_rejected(name in "[a-z]{1,8}[^A-Za-z0-9_\\s]{1,4}[a-z]{0,8}") {
            let gate = Gate::new(Arc::new(FixedSwitch::new(true)), std::env::temp_dir());
            let args = json!({"schema": "public", "table": name, "cascade": false});
            let err = gate.check(spec("pg_drop_table"), &args).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::Validation);
        }

        #[test]
        fn prop_identifier_table_accepted(name in "[a-z_][a-z0-9_]{0,40}") {
            let gate = Gate::new(Arc::new(FixedSwitch::new(true)), std::env::temp_dir());
            let args = json!({"schema": "public", "table": name});
            prop_assert!(gate.check(spec("pg_drop_table"), &args).is_ok());
        }
    }
}
