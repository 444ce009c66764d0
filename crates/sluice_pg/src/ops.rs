//! Descriptor table for the PostgreSQL family.

use sluice_policy::{OperationSpec, ParamSpec, ParamType, Rule};

pub(crate) const FAMILY: &str = "pg";

const SCHEMA: ParamSpec = ParamSpec::ident("schema").required();
const SCHEMA_PUBLIC: ParamSpec = ParamSpec::ident("schema").default_str("public");
const TABLE: ParamSpec = ParamSpec::ident("table").required();
const CASCADE: ParamSpec = ParamSpec::boolean("cascade").default_bool(false);
const USERNAME: ParamSpec = ParamSpec::ident("username").required();

const SYSTEM_SCHEMAS: &[&str] = &["public", "pg_catalog", "information_schema"];

/// Index access methods accepted by `pg_create_index`
pub(crate) const INDEX_METHODS: &[&str] = &["btree", "hash", "gist", "gin", "brin", "spgist"];

pub(crate) static OPERATIONS: &[OperationSpec] = &[
    // Catalog and introspection
    OperationSpec::safe(FAMILY, "pg_health", "Connectivity and server identity"),
    OperationSpec::safe(FAMILY, "pg_list_schemas", "Non-system schemas"),
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_list_tables", "Tables in a schema")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE],
        ..OperationSpec::safe(FAMILY, "pg_describe_table", "Columns with type, nullability and default")
    },
    OperationSpec {
        params: &[ParamSpec::string("name").required()],
        ..OperationSpec::safe(FAMILY, "pg_show_setting", "One server setting")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_list_views", "Views in a schema")
    },
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("view").required()],
        ..OperationSpec::safe(FAMILY, "pg_view_definition", "SQL definition of a view")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_list_functions", "Functions and procedures in a schema")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE],
        ..OperationSpec::safe(FAMILY, "pg_table_constraints", "Primary, foreign, unique and check constraints")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_foreign_keys", "Foreign key relationships in a schema")
    },
    // Databases
    OperationSpec::safe(FAMILY, "pg_list_databases", "Non-template databases with sizes"),
    OperationSpec {
        params: &[ParamSpec::ident("database").describe("Defaults to the connected database")],
        ..OperationSpec::safe(FAMILY, "pg_database_stats", "Size, connections and transaction age")
    },
    OperationSpec {
        params: &[
            ParamSpec::ident("database").required(),
            ParamSpec::ident("owner"),
            ParamSpec::string("encoding").default_str("UTF8"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_create_database", "Create a database")
    },
    OperationSpec {
        params: &[
            ParamSpec::ident("database").required(),
            ParamSpec::boolean("force")
                .default_bool(false)
                .describe("Terminate other connections first"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_drop_database", "Drop a database other than the connected one")
    },
    // Schemas
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("authorization")],
        ..OperationSpec::dangerous(FAMILY, "pg_create_schema", "Create a schema")
    },
    OperationSpec {
        params: &[SCHEMA, CASCADE],
        rules: &[Rule::NotOneOf {
            param: "schema",
            denied: SYSTEM_SCHEMAS,
        }],
        ..OperationSpec::dangerous(FAMILY, "pg_drop_schema", "Drop a schema")
    },
    // Tables
    OperationSpec {
        params: &[SCHEMA_PUBLIC, ParamSpec::ident("table")],
        ..OperationSpec::safe(FAMILY, "pg_table_size", "Table, index and total sizes")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE],
        ..OperationSpec::safe(FAMILY, "pg_table_stats", "Row counts and vacuum history of a table")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_bloat_check", "Tables with the most dead rows")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::string("columns")
                .required()
                .describe("Column definitions, e.g. id serial PRIMARY KEY, name text; ';' only inside quotes, no comments"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_create_table", "Create a table")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE, CASCADE],
        ..OperationSpec::dangerous(FAMILY, "pg_drop_table", "Drop a table")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::string("alteration")
                .required()
                .describe("e.g. ADD COLUMN email text; ';' only inside quotes, no comments"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_alter_table", "Alter a table")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            CASCADE,
            ParamSpec::boolean("restart_identity").default_bool(false),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_truncate_table", "Remove every row of a table")
    },
    // Indexes
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("table")],
        ..OperationSpec::safe(FAMILY, "pg_list_indexes", "Indexes of a schema or one table")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_index_usage", "Index scan statistics")
    },
    OperationSpec {
        params: &[SCHEMA_PUBLIC],
        ..OperationSpec::safe(FAMILY, "pg_unused_indexes", "Indexes never scanned")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::ident("index_name").required(),
            ParamSpec::ident_list("columns").required(),
            ParamSpec::boolean("unique").default_bool(false),
            ParamSpec::string("method").default_str("btree"),
        ],
        rules: &[Rule::OneOf {
            param: "method",
            allowed: INDEX_METHODS,
        }],
        ..OperationSpec::dangerous(FAMILY, "pg_create_index", "Create an index")
    },
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("index_name").required(), CASCADE],
        ..OperationSpec::dangerous(FAMILY, "pg_drop_index", "Drop an index")
    },
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("table"), ParamSpec::ident("index")],
        rules: &[Rule::AtLeastOne(&["table", "index"])],
        ..OperationSpec::dangerous(FAMILY, "pg_reindex", "Rebuild one index or every index of a table")
    },
    // Users and permissions
    OperationSpec::safe(FAMILY, "pg_list_users", "Roles and their attributes"),
    OperationSpec {
        params: &[USERNAME],
        ..OperationSpec::safe(FAMILY, "pg_user_permissions", "Table privileges held by a role")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE],
        ..OperationSpec::safe(FAMILY, "pg_table_permissions", "Privileges granted on a table")
    },
    OperationSpec {
        params: &[
            USERNAME,
            ParamSpec::string("password").required().verbatim(),
            ParamSpec::boolean("superuser").default_bool(false),
            ParamSpec::boolean("createdb").default_bool(false),
            ParamSpec::boolean("createrole").default_bool(false),
            ParamSpec::boolean("login").default_bool(true),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_create_user", "Create a role")
    },
    OperationSpec {
        params: &[
            USERNAME,
            ParamSpec::string("password").verbatim(),
            ParamSpec::boolean("superuser"),
            ParamSpec::boolean("createdb"),
            ParamSpec::boolean("createrole"),
            ParamSpec::boolean("login"),
        ],
        rules: &[Rule::AtLeastOne(&[
            "password",
            "superuser",
            "createdb",
            "createrole",
            "login",
        ])],
        ..OperationSpec::dangerous(FAMILY, "pg_alter_user", "Change role attributes or password")
    },
    OperationSpec {
        params: &[USERNAME],
        ..OperationSpec::dangerous(FAMILY, "pg_drop_user", "Drop a role")
    },
    OperationSpec {
        params: &[
            USERNAME,
            ParamSpec::string("privileges").required().describe("e.g. SELECT, INSERT"),
            SCHEMA,
            ParamSpec::ident("table").describe("Omit for every table in the schema"),
        ],
        rules: &[Rule::PrivilegeList("privileges")],
        ..OperationSpec::dangerous(FAMILY, "pg_grant_privileges", "Grant table privileges")
    },
    OperationSpec {
        params: &[
            USERNAME,
            ParamSpec::string("privileges").required(),
            SCHEMA,
            ParamSpec::ident("table"),
        ],
        rules: &[Rule::PrivilegeList("privileges")],
        ..OperationSpec::dangerous(FAMILY, "pg_revoke_privileges", "Revoke table privileges")
    },
    // Monitoring
    OperationSpec {
        params: &[ParamSpec::boolean("include_idle").default_bool(false)],
        ..OperationSpec::safe(FAMILY, "pg_active_queries", "Current sessions and their queries")
    },
    OperationSpec {
        params: &[ParamSpec::int("min_seconds").default_int(60)],
        ..OperationSpec::safe(FAMILY, "pg_long_running_queries", "Active queries older than min_seconds")
    },
    OperationSpec::safe(FAMILY, "pg_blocking_queries", "Sessions blocked by other sessions"),
    OperationSpec::safe(FAMILY, "pg_connection_stats", "Connection counts by state"),
    OperationSpec::safe(FAMILY, "pg_locks_summary", "Lock counts by type and mode"),
    OperationSpec::safe(FAMILY, "pg_cache_hit_ratio", "Heap cache hit ratio"),
    OperationSpec {
        params: &[ParamSpec::int("limit").default_int(20)],
        rules: &[Rule::ClampLimit {
            param: "limit",
            max: 100,
        }],
        ..OperationSpec::safe(FAMILY, "pg_slowest_queries", "Top statements from pg_stat_statements")
    },
    OperationSpec::safe(FAMILY, "pg_replication_status", "Replication peers and lag"),
    OperationSpec::safe(FAMILY, "pg_vacuum_stats", "Vacuum and analyze history"),
    OperationSpec {
        params: &[ParamSpec::int("pid").required()],
        rules: &[Rule::Positive("pid")],
        ..OperationSpec::dangerous(FAMILY, "pg_kill_query", "Terminate a backend")
    },
    OperationSpec {
        params: &[ParamSpec::int("pid").required()],
        rules: &[Rule::Positive("pid")],
        ..OperationSpec::dangerous(FAMILY, "pg_cancel_query", "Cancel the running query of a backend")
    },
    // Maintenance
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::boolean("full").default_bool(false),
            ParamSpec::boolean("analyze").default_bool(true),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_vacuum_table", "Vacuum a table")
    },
    OperationSpec {
        params: &[SCHEMA, ParamSpec::ident("table").describe("Omit to analyze every table")],
        ..OperationSpec::dangerous(FAMILY, "pg_analyze_table", "Refresh planner statistics")
    },
    // Data manipulation
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::ident_list("columns").required(),
            ParamSpec::new("values", ParamType::Array)
                .required()
                .describe("One row, or an array of rows"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_insert_data", "Insert rows")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::new("values", ParamType::Object)
                .required()
                .describe("Column to new value"),
            ParamSpec::string("where_clause")
                .describe("Filter without WHERE; ';' only inside quotes, no comments"),
        ],
        ..OperationSpec::dangerous(FAMILY, "pg_update_data", "Update rows")
    },
    OperationSpec {
        params: &[
            SCHEMA,
            TABLE,
            ParamSpec::string("where_clause")
                .describe("Filter without WHERE; ';' only inside quotes, no comments"),
        ],
        rules: &[Rule::NonEmptyFilter("where_clause")],
        ..OperationSpec::dangerous(FAMILY, "pg_delete_data", "Delete rows matching a filter")
    },
    // Queries
    OperationSpec {
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
        ..OperationSpec::safe(FAMILY, "pg_query", "Run a read-only SELECT")
    },
    OperationSpec {
        params: &[ParamSpec::string("sql").required()],
        ..OperationSpec::dangerous(FAMILY, "pg_execute_sql", "Run arbitrary SQL")
    },
    OperationSpec {
        params: &[
            ParamSpec::string("sql").required(),
            ParamSpec::boolean("analyze").default_bool(false),
        ],
        rules: &[Rule::ReadOnlySqlWhen {
            param: "sql",
            flag: "analyze",
        }],
        ..OperationSpec::safe(FAMILY, "pg_explain_query", "JSON execution plan")
    },
    // Export
    OperationSpec {
        params: &[SCHEMA, TABLE, ParamSpec::int("limit").default_int(10_000)],
        rules: &[Rule::ClampLimit {
            param: "limit",
            max: 100_000,
        }],
        ..OperationSpec::safe(FAMILY, "pg_export_table_csv", "Table rows as CSV")
    },
    OperationSpec {
        params: &[SCHEMA, TABLE, ParamSpec::int("max_rows").default_int(10_000)],
        rules: &[Rule::ClampLimit {
            param: "max_rows",
            max: 100_000,
        }],
        ..OperationSpec::safe(FAMILY, "pg_backup_table_sql", "CREATE TABLE and INSERT statements for a table")
    },
    // System
    OperationSpec {
        params: &[ParamSpec::string("pattern").describe("Substring of the setting name")],
        ..OperationSpec::safe(FAMILY, "pg_server_settings", "Server settings")
    },
    OperationSpec::safe(FAMILY, "pg_extensions", "Installed extensions"),
    OperationSpec::safe(FAMILY, "pg_tablespaces", "Tablespaces"),
    OperationSpec::safe(FAMILY, "pg_database_activity_summary", "Connections, size and row totals"),
];
