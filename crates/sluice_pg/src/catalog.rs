//! Read-only catalog and statistics queries.
//!
//! Parameters are positional (`$1`, `$2`) and always bound, never
//! interpolated.

pub const HEALTH: &str = r#"
SELECT
  now()                    AS server_time,
  current_database()       AS database,
  current_user             AS "user",
  inet_server_addr()::text AS server_ip,
  inet_server_port()       AS server_port,
  version()                AS version
"#;

pub const LIST_SCHEMAS: &str = r#"
SELECT nspname AS schema
FROM pg_namespace
WHERE nspname NOT IN ('pg_catalog', 'information_schema')
  AND nspname NOT LIKE 'pg_toast%'
  AND nspname NOT LIKE 'pg_temp_%'
ORDER BY 1
"#;

pub const LIST_TABLES: &str = r#"
SELECT tablename AS "table"
FROM pg_catalog.pg_tables
WHERE schemaname = $1
ORDER BY 1
"#;

pub const DESCRIBE_TABLE: &str = r#"
SELECT column_name, data_type, is_nullable, column_default
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position
"#;

pub const SHOW_SETTING: &str =
    "SELECT name, setting, unit, context, source FROM pg_settings WHERE name = $1";

pub const LIST_VIEWS: &str = r#"
SELECT schemaname AS schema, viewname AS view, viewowner AS owner
FROM pg_views
WHERE schemaname = $1
ORDER BY viewname
"#;

pub const VIEW_DEFINITION: &str = r#"
SELECT schemaname AS schema, viewname AS view, definition
FROM pg_views
WHERE schemaname = $1 AND viewname = $2
"#;

pub const LIST_FUNCTIONS: &str = r#"
SELECT
  n.nspname AS schema,
  p.proname AS function,
  pg_get_function_result(p.oid) AS returns,
  pg_get_function_arguments(p.oid) AS arguments,
  CASE p.prokind
    WHEN 'f' THEN 'function'
    WHEN 'p' THEN 'procedure'
    WHEN 'a' THEN 'aggregate'
    WHEN 'w' THEN 'window'
  END AS type
FROM pg_proc p
JOIN pg_namespace n ON p.pronamespace = n.oid
WHERE n.nspname = $1
ORDER BY p.proname
"#;

pub const TABLE_CONSTRAINTS: &str = r#"
SELECT
  tc.constraint_name AS constraint,
  tc.constraint_type AS type,
  kcu.column_name AS column,
  ccu.table_schema AS foreign_schema,
  ccu.table_name AS foreign_table,
  ccu.column_name AS foreign_column
FROM information_schema.table_constraints tc
LEFT JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
  AND tc.table_schema = kcu.table_schema
LEFT JOIN information_schema.constraint_column_usage ccu
  ON tc.constraint_name = ccu.constraint_name
  AND tc.table_schema = ccu.table_schema
WHERE tc.table_schema = $1 AND tc.table_name = $2
ORDER BY tc.constraint_type, tc.constraint_name
"#;

pub const FOREIGN_KEYS: &str = r#"
SELECT
  tc.table_schema AS schema,
  tc.table_name AS "table",
  kcu.column_name AS column,
  ccu.table_schema AS foreign_schema,
  ccu.table_name AS foreign_table,
  ccu.column_name AS foreign_column,
  tc.constraint_name AS constraint
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
  AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON tc.constraint_name = ccu.constraint_name
  AND tc.table_schema = ccu.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
ORDER BY tc.table_name, kcu.column_name
"#;

pub const LIST_DATABASES: &str = r#"
SELECT
  datname AS database,
  pg_size_pretty(pg_database_size(datname)) AS size,
  pg_database_size(datname) AS size_bytes,
  (SELECT count(*) FROM pg_stat_activity a WHERE a.datname = d.datname) AS connections
FROM pg_database d
WHERE datistemplate = false
ORDER BY pg_database_size(datname) DESC
"#;

pub const DATABASE_STATS: &str = r#"
SELECT
  datname AS database,
  pg_size_pretty(pg_database_size(datname)) AS size,
  pg_database_size(datname) AS size_bytes,
  (SELECT count(*) FROM pg_stat_activity a WHERE a.datname = d.datname) AS active_connections,
  datconnlimit AS connection_limit,
  age(datfrozenxid) AS transaction_age
FROM pg_database d
WHERE datname = $1
"#;

const TABLE_SIZE_COLUMNS: &str = r#"
SELECT
  schemaname AS schema,
  tablename AS "table",
  pg_size_pretty(pg_total_relation_size(format('%I.%I', schemaname, tablename)::regclass)) AS total_size,
  pg_size_pretty(pg_relation_size(format('%I.%I', schemaname, tablename)::regclass)) AS table_size,
  pg_size_pretty(pg_indexes_size(format('%I.%I', schemaname, tablename)::regclass)) AS indexes_size,
  pg_total_relation_size(format('%I.%I', schemaname, tablename)::regclass) AS total_bytes
FROM pg_tables
"#;

/// Size of every table in `$1`, largest first
#[must_use]
pub fn table_sizes() -> String {
    format!(
        "{} WHERE schemaname = $1 ORDER BY total_bytes DESC",
        TABLE_SIZE_COLUMNS
    )
}

/// Size of table `$2` in schema `$1`
#[must_use]
pub fn table_size() -> String {
    format!(
        "{} WHERE schemaname = $1 AND tablename = $2",
        TABLE_SIZE_COLUMNS
    )
}

pub const TABLE_STATS: &str = r#"
SELECT
  schemaname AS schema,
  relname AS "table",
  n_live_tup AS live_rows,
  n_dead_tup AS dead_rows,
  n_tup_ins AS inserts,
  n_tup_upd AS updates,
  n_tup_del AS deletes,
  last_vacuum,
  last_autovacuum,
  last_analyze,
  last_autoanalyze
FROM pg_stat_user_tables
WHERE schemaname = $1 AND relname = $2
"#;

pub const BLOAT_CHECK: &str = r#"
SELECT
  schemaname AS schema,
  relname AS "table",
  pg_size_pretty(pg_total_relation_size(relid)) AS size,
  n_dead_tup AS dead_rows,
  n_live_tup AS live_rows,
  ROUND(n_dead_tup * 100.0 / NULLIF(n_live_tup + n_dead_tup, 0), 2) AS dead_ratio
FROM pg_stat_user_tables
WHERE schemaname = $1 AND n_dead_tup > 0
ORDER BY n_dead_tup DESC
LIMIT 20
"#;

pub const LIST_INDEXES: &str = r#"
SELECT schemaname AS schema, tablename AS "table", indexname AS index, indexdef AS definition
FROM pg_indexes
WHERE schemaname = $1
ORDER BY tablename, indexname
"#;

pub const LIST_TABLE_INDEXES: &str = r#"
SELECT schemaname AS schema, tablename AS "table", indexname AS index, indexdef AS definition
FROM pg_indexes
WHERE schemaname = $1 AND tablename = $2
ORDER BY tablename, indexname
"#;

pub const INDEX_USAGE: &str = r#"
SELECT
  schemaname AS schema,
  relname AS "table",
  indexrelname AS index,
  idx_scan AS scans,
  idx_tup_read AS rows_read,
  idx_tup_fetch AS rows_fetched,
  pg_size_pretty(pg_relation_size(indexrelid)) AS size
FROM pg_stat_user_indexes
WHERE schemaname = $1
ORDER BY idx_scan ASC, pg_relation_size(indexrelid) DESC
"#;

pub const UNUSED_INDEXES: &str = r#"
SELECT
  s.schemaname AS schema,
  s.relname AS "table",
  s.indexrelname AS index,
  pg_size_pretty(pg_relation_size(s.indexrelid)) AS size,
  s.idx_scan AS scans
FROM pg_stat_user_indexes s
JOIN pg_index i ON i.indexrelid = s.indexrelid
WHERE s.schemaname = $1
  AND s.idx_scan = 0
  AND NOT i.indisprimary
  AND NOT i.indisunique
ORDER BY pg_relation_size(s.indexrelid) DESC
"#;

pub const LIST_USERS: &str = r#"
SELECT
  rolname AS username,
  rolsuper AS is_superuser,
  rolinherit AS inherit_privileges,
  rolcreaterole AS can_create_roles,
  rolcreatedb AS can_create_db,
  rolcanlogin AS can_login,
  rolconnlimit AS connection_limit,
  rolvaliduntil AS valid_until
FROM pg_roles
ORDER BY rolname
"#;

pub const USER_PERMISSIONS: &str = r#"
SELECT table_schema AS schema, table_name AS "table", privilege_type
FROM information_schema.table_privileges
WHERE grantee = $1
ORDER BY table_schema, table_name, privilege_type
"#;

pub const TABLE_PERMISSIONS: &str = r#"
SELECT grantee AS "user", privilege_type AS privilege, is_grantable
FROM information_schema.table_privileges
WHERE table_schema = $1 AND table_name = $2
ORDER BY grantee, privilege_type
"#;

/// Sessions other than ours, idle ones only when `include_idle`
#[must_use]
pub fn active_queries(include_idle: bool) -> String {
    format!(
        r#"
SELECT
  pid,
  usename AS "user",
  application_name AS application,
  client_addr::text AS client,
  state,
  query_start,
  state_change,
  wait_event_type,
  wait_event,
  LEFT(query, 200) AS query
FROM pg_stat_activity
WHERE pid <> pg_backend_pid()
  {}
ORDER BY query_start DESC NULLS LAST
LIMIT 50
"#,
        if include_idle { "" } else { "AND state <> 'idle'" }
    )
}

pub const LONG_RUNNING_QUERIES: &str = r#"
SELECT
  pid,
  usename AS "user",
  application_name AS application,
  state,
  EXTRACT(EPOCH FROM (now() - query_start))::int AS duration_seconds,
  query_start,
  LEFT(query, 200) AS query
FROM pg_stat_activity
WHERE state = 'active'
  AND pid <> pg_backend_pid()
  AND query_start < now() - ($1::bigint * interval '1 second')
ORDER BY query_start
"#;

pub const BLOCKING_QUERIES: &str = r#"
SELECT
  blocked.pid AS blocked_pid,
  blocked.usename AS blocked_user,
  blocking.pid AS blocking_pid,
  blocking.usename AS blocking_user,
  blocked.query AS blocked_query,
  blocking.query AS blocking_query,
  blocked.state AS blocked_state,
  blocking.state AS blocking_state
FROM pg_stat_activity blocked
JOIN LATERAL unnest(pg_blocking_pids(blocked.pid)) AS b(pid) ON true
JOIN pg_stat_activity blocking ON blocking.pid = b.pid
ORDER BY blocked.pid
"#;

pub const CONNECTION_STATS: &str = r#"
SELECT
  count(*) AS total_connections,
  count(*) FILTER (WHERE state = 'active') AS active,
  count(*) FILTER (WHERE state = 'idle') AS idle,
  count(*) FILTER (WHERE state = 'idle in transaction') AS idle_in_transaction,
  max(EXTRACT(EPOCH FROM (now() - query_start))::int) AS longest_query_seconds
FROM pg_stat_activity
WHERE pid <> pg_backend_pid()
"#;

pub const LOCKS_SUMMARY: &str = r#"
SELECT locktype, mode, count(*) AS count
FROM pg_locks
GROUP BY locktype, mode
ORDER BY count DESC
"#;

pub const CACHE_HIT_RATIO: &str = r#"
SELECT
  sum(heap_blks_read) AS heap_read,
  sum(heap_blks_hit) AS heap_hit,
  ROUND(sum(heap_blks_hit) * 100.0 / NULLIF(sum(heap_blks_hit) + sum(heap_blks_read), 0), 2) AS cache_hit_ratio
FROM pg_statio_user_tables
"#;

pub const SLOWEST_QUERIES: &str = r#"
SELECT
  LEFT(query, 200) AS query,
  calls,
  ROUND(total_exec_time::numeric, 2) AS total_time_ms,
  ROUND(mean_exec_time::numeric, 2) AS mean_time_ms,
  ROUND(max_exec_time::numeric, 2) AS max_time_ms,
  rows AS total_rows
FROM pg_stat_statements
ORDER BY total_exec_time DESC
LIMIT $1
"#;

pub const REPLICATION_STATUS: &str = r#"
SELECT
  client_addr::text AS client_addr,
  state,
  sync_state,
  replay_lag::text AS replay_lag,
  write_lag::text AS write_lag,
  flush_lag::text AS flush_lag
FROM pg_stat_replication
"#;

pub const VACUUM_STATS: &str = r#"
SELECT
  schemaname AS schema,
  relname AS "table",
  last_vacuum,
  last_autovacuum,
  last_analyze,
  last_autoanalyze,
  n_dead_tup AS dead_rows,
  n_live_tup AS live_rows
FROM pg_stat_user_tables
ORDER BY last_autovacuum NULLS FIRST, n_dead_tup DESC
LIMIT 50
"#;

pub const TERMINATE_BACKEND: &str = "SELECT pg_terminate_backend($1::int) AS done";

pub const CANCEL_BACKEND: &str = "SELECT pg_cancel_backend($1::int) AS done";

/// Column definitions used to rebuild a table
pub const TABLE_COLUMNS_DDL: &str = r#"
SELECT
  a.attname AS column_name,
  format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  pg_get_expr(d.adbin, d.adrelid) AS column_default
FROM pg_attribute a
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
WHERE a.attrelid = format('%I.%I', $1::text, $2::text)::regclass
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

pub const SETTINGS_MATCHING: &str = r#"
SELECT name, setting, unit, category, short_desc
FROM pg_settings
WHERE name ILIKE '%' || $1 || '%'
ORDER BY name
"#;

pub const SETTINGS_ALL: &str = r#"
SELECT name, setting, unit, category, short_desc
FROM pg_settings
ORDER BY category, name
LIMIT 100
"#;

pub const EXTENSIONS: &str = r#"
SELECT
  extname AS extension,
  extversion AS version,
  nspname AS schema,
  extrelocatable AS relocatable,
  extconfig::text AS configuration
FROM pg_extension e
JOIN pg_namespace n ON e.extnamespace = n.oid
ORDER BY extname
"#;

pub const TABLESPACES: &str = r#"
SELECT
  spcname AS tablespace,
  pg_tablespace_location(oid) AS location,
  pg_size_pretty(pg_tablespace_size(spcname)) AS size
FROM pg_tablespace
ORDER BY spcname
"#;

pub const ACTIVITY_SUMMARY: &str = r#"
SELECT
  (SELECT count(*) FROM pg_stat_activity) AS total_connections,
  (SELECT count(*) FROM pg_stat_activity WHERE state = 'active') AS active_queries,
  (SELECT count(*) FROM pg_stat_activity WHERE state = 'idle in transaction') AS idle_in_transaction,
  (SELECT pg_size_pretty(pg_database_size(current_database()))) AS database_size,
  (SELECT count(*) FROM pg_stat_user_tables) AS total_tables,
  (SELECT sum(n_live_tup) FROM pg_stat_user_tables) AS total_rows,
  (SELECT sum(n_dead_tup) FROM pg_stat_user_tables) AS dead_rows
"#;
