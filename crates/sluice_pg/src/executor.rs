//! SQL execution behind a trait, with the sqlx-backed PostgreSQL executor.
//!
//! Rows travel as ordered JSON objects: [`SqlExecutor::fetch_rows`] wraps the
//! statement in `json_agg` so the server does the row encoding and column
//! types never need a Rust mapping. A result with two columns of the same
//! name cannot be keyed that way and is refused rather than collapsed.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::{Map, Value};
use std::fmt;
use sluice_core::{PgSettings, SslMode, ToolError, ToolResult};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

/// One result row, columns in select-list order
pub type Row = Map<String, Value>;

/// Bind parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// text
    Text(String),
    /// bigint
    Int(i64),
    /// boolean
    Bool(bool),
    /// jsonb
    Json(Value),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Executes SQL against the configured server
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Rows of a single query
    async fn fetch_rows(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>>;

    /// First column of the first row of a query returning `json`
    async fn fetch_value(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value>;

    /// [`fetch_rows`](Self::fetch_rows) inside a `READ ONLY` transaction
    /// that is rolled back afterwards
    async fn fetch_rows_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>>;

    /// [`fetch_value`](Self::fetch_value) inside a `READ ONLY` transaction
    /// that is rolled back afterwards
    async fn fetch_value_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value>;

    /// Run one statement in its own transaction; returns rows affected
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> ToolResult<u64>;

    /// Run statements over the simple protocol in autocommit mode
    async fn execute_script(&self, sql: &str) -> ToolResult<u64>;
}

/// Wrap a query so the server returns its rows as one JSON array (as text,
/// so duplicate keys survive until [`decode_rows`] sees them)
#[must_use]
pub fn json_rows_sql(sql: &str) -> String {
    format!(
        "SELECT COALESCE(json_agg(q), '[]'::json)::text FROM ({}\n) AS q",
        sql
    )
}

struct DecodedRow {
    row: Row,
    duplicate: Option<String>,
}

impl<'de> Deserialize<'de> for DecodedRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = DecodedRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a row object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DecodedRow, A::Error> {
                let mut row = Row::new();
                let mut duplicate = None;
                while let Some((column, value)) = map.next_entry::<String, Value>()? {
                    if row.contains_key(&column) {
                        duplicate.get_or_insert(column);
                    } else {
                        row.insert(column, value);
                    }
                }
                Ok(DecodedRow { row, duplicate })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Decode the text produced by [`json_rows_sql`].
///
/// # Errors
///
/// Returns a validation error when two result columns share a name, and an
/// upstream error for anything that is not an array of objects.
pub fn decode_rows(text: &str) -> ToolResult<Vec<Row>> {
    let decoded: Vec<DecodedRow> = serde_json::from_str(text).map_err(|e| {
        ToolError::upstream("postgres", format!("unreadable row encoding: {}", e))
    })?;
    let mut rows = Vec::with_capacity(decoded.len());
    for item in decoded {
        if let Some(column) = item.duplicate {
            return Err(ToolError::validation(
                "sql",
                format!(
                    "result has more than one column named {:?}; give each column a distinct alias",
                    column
                ),
            ));
        }
        rows.push(item.row);
    }
    Ok(rows)
}

macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlParam::Text(v) => query.bind(v.as_str()),
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Bool(v) => query.bind(*v),
                SqlParam::Json(v) => query.bind(Json(v.clone())),
            };
        }
        query
    }};
}

/// sqlx connection pool executor
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Build a lazily connecting pool; nothing touches the network until
    /// the first statement runs.
    #[must_use]
    pub fn connect_lazy(settings: &PgSettings) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(settings.password.expose_secret())
            .ssl_mode(ssl_mode(settings.ssl_mode))
            .application_name("sluice");
        let pool = PgPoolOptions::new()
            .min_connections(settings.pool_min)
            .max_connections(settings.pool_max)
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy_with(options);
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            pool_max = settings.pool_max,
            "postgres pool configured"
        );
        Self { pool }
    }

    /// Underlying pool
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_read_only(&self) -> ToolResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;
        Ok(tx)
    }
}

fn ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn fetch_rows(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>> {
        let wrapped = json_rows_sql(sql);
        let text: String = bind_params!(sqlx::query_scalar::<_, String>(&wrapped), params)
            .fetch_one(&self.pool)
            .await
            .map_err(sql_error)?;
        decode_rows(&text)
    }

    async fn fetch_rows_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Vec<Row>> {
        let wrapped = json_rows_sql(sql);
        let mut tx = self.begin_read_only().await?;
        let text: String = bind_params!(sqlx::query_scalar::<_, String>(&wrapped), params)
            .fetch_one(&mut *tx)
            .await
            .map_err(sql_error)?;
        tx.rollback().await.map_err(sql_error)?;
        decode_rows(&text)
    }

    async fn fetch_value_read_only(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value> {
        let mut tx = self.begin_read_only().await?;
        let value = bind_params!(sqlx::query_scalar::<_, Value>(sql), params)
            .fetch_one(&mut *tx)
            .await
            .map_err(sql_error)?;
        tx.rollback().await.map_err(sql_error)?;
        Ok(value)
    }

    async fn fetch_value(&self, sql: &str, params: &[SqlParam]) -> ToolResult<Value> {
        bind_params!(sqlx::query_scalar::<_, Value>(sql), params)
            .fetch_one(&self.pool)
            .await
            .map_err(sql_error)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> ToolResult<u64> {
        let done = bind_params!(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(done.rows_affected())
    }

    async fn execute_script(&self, sql: &str) -> ToolResult<u64> {
        let done = sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(done.rows_affected())
    }
}

/// Classify a sqlx failure
#[must_use]
pub fn sql_error(err: sqlx::Error) -> ToolError {
    match &err {
        sqlx::Error::PoolTimedOut => ToolError::upstream(
            "postgres",
            "timed out waiting for a pooled connection",
        ),
        sqlx::Error::Database(db) => classify_sqlstate(db.code().as_deref(), db.message()),
        _ => ToolError::upstream("postgres", err.to_string()),
    }
}

/// Map a SQLSTATE to the error taxonomy, keeping the server's message
#[must_use]
pub fn classify_sqlstate(code: Option<&str>, message: &str) -> ToolError {
    match code {
        Some("42P01" | "42704" | "3D000" | "3F000" | "42883") => {
            ToolError::not_found("object", message)
        }
        Some("55006" | "42P04" | "42P06" | "42P07" | "42710" | "2BP01") => {
            ToolError::conflict(message)
        }
        Some(c) if c.starts_with("23") => ToolError::conflict(message),
        Some("25006") => ToolError::validation("sql", message),
        _ => ToolError::upstream("postgres", message),
    }
}
