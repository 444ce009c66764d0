//! Process settings loaded once at startup.
//!
//! Values come from the environment after `.env` has been loaded. Only the
//! danger flag is read again per call (see [`crate::danger::EnvSwitch`]);
//! everything here is fixed for the process lifetime.

use secrecy::SecretString;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::danger::parse_flag;

/// Errors raised while reading settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable is present but cannot be parsed
    #[error("Invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: String,
        /// Why it was rejected
        reason: String,
    },

    /// Variable is required but absent
    #[error("Missing required variable {var}")]
    Missing {
        /// Variable name
        var: String,
    },
}

impl ConfigError {
    fn invalid(var: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

/// TLS mode for the PostgreSQL connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    /// Never use TLS
    Disable,
    /// Try plaintext first
    Allow,
    /// Try TLS first
    Prefer,
    /// Require TLS, skip verification
    Require,
    /// Require TLS, verify the CA
    VerifyCa,
    /// Require TLS, verify CA and host name
    VerifyFull,
}

impl SslMode {
    /// Parse a libpq-style `sslmode` value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" => Some(Self::Disable),
            "allow" => Some(Self::Allow),
            "prefer" => Some(Self::Prefer),
            "require" => Some(Self::Require),
            "verify-ca" => Some(Self::VerifyCa),
            "verify-full" => Some(Self::VerifyFull),
            _ => None,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// PostgreSQL connection and pool settings
#[derive(Debug)]
pub struct PgSettings {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Configured database
    pub database: String,
    /// Login role
    pub user: String,
    /// Login password
    pub password: SecretString,
    /// TLS mode
    pub ssl_mode: SslMode,
    /// Connections kept open
    pub pool_min: u32,
    /// Connection ceiling
    pub pool_max: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

/// Git subprocess settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// Executable name or path
    pub bin: String,
    /// Per-invocation timeout
    pub timeout: Duration,
}

/// Transport settings
#[derive(Debug)]
pub struct ServerSettings {
    /// HTTP bind address
    pub bind: SocketAddr,
    /// Bearer key required on `/mcp`; `None` disables authentication
    pub api_key: Option<SecretString>,
    /// Log line format
    pub log_format: LogFormat,
}

/// Everything read from the environment at startup
#[derive(Debug)]
pub struct Settings {
    /// Notes file path
    pub notes_file: PathBuf,
    /// Base directory for relative filesystem and git paths
    pub fs_root: PathBuf,
    /// Git settings
    pub git: GitSettings,
    /// PostgreSQL settings, absent when a required variable is missing
    pub pg: Option<PgSettings>,
    /// First missing PostgreSQL variable, when `pg` is `None`
    pub pg_missing: Option<String>,
    /// Transport settings
    pub server: ServerSettings,
}

impl Settings {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present with an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present with an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let notes_file = PathBuf::from(get("NOTES_FILE").unwrap_or_else(|| "notes.txt".into()));
        let fs_root = PathBuf::from(get("FS_ROOT").unwrap_or_else(|| ".".into()));

        let git = GitSettings {
            bin: get("GIT_BIN").unwrap_or_else(|| "git".into()),
            timeout: Duration::from_secs(parse_number(&get, "GIT_TIMEOUT_SECS", 60u64)?),
        };

        let (pg, pg_missing) = match read_pg(&get)? {
            Ok(pg) => (Some(pg), None),
            Err(missing) => (None, Some(missing)),
        };

        let server = read_server(&get)?;

        Ok(Self {
            notes_file,
            fs_root,
            git,
            pg,
            pg_missing,
            server,
        })
    }

    /// Whether the SQL tool family can be registered
    #[must_use]
    pub fn has_postgres(&self) -> bool {
        self.pg.is_some()
    }
}

fn parse_number<T, G>(get: &G, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(var, format!("{:?}: {}", raw, e))),
    }
}

/// Outer error is fatal; inner `Err` names the first missing variable.
fn read_pg<G>(get: &G) -> Result<Result<PgSettings, String>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let port = parse_number(get, "PGPORT", 5432u16)?;
    let ssl_mode = match get("PGSSLMODE") {
        None => SslMode::Prefer,
        Some(raw) => SslMode::parse(&raw).ok_or_else(|| {
            ConfigError::invalid(
                "PGSSLMODE",
                format!(
                    "{:?} is not one of disable, allow, prefer, require, verify-ca, verify-full",
                    raw
                ),
            )
        })?,
    };
    let pool_min = parse_number(get, "PG_POOL_MIN", 1u32)?;
    let pool_max = parse_number(get, "PG_POOL_MAX", 5u32)?;
    if pool_max == 0 {
        return Err(ConfigError::invalid("PG_POOL_MAX", "must be at least 1"));
    }
    if pool_min > pool_max {
        return Err(ConfigError::invalid(
            "PG_POOL_MIN",
            format!("{} exceeds PG_POOL_MAX {}", pool_min, pool_max),
        ));
    }
    let acquire_timeout = Duration::from_secs(parse_number(get, "PG_POOL_TIMEOUT_SECS", 10u64)?);

    let mut required = Vec::with_capacity(4);
    for var in ["PGHOST", "PGDATABASE", "PGUSER", "PGPASSWORD"] {
        match get(var) {
            Some(value) => required.push(value),
            None => return Ok(Err(var.to_string())),
        }
    }
    let mut required = required.into_iter();
    let (Some(host), Some(database), Some(user), Some(password)) = (
        required.next(),
        required.next(),
        required.next(),
        required.next(),
    ) else {
        return Ok(Err("PGHOST".to_string()));
    };

    Ok(Ok(PgSettings {
        host,
        port,
        database,
        user,
        password: SecretString::from(password),
        ssl_mode,
        pool_min,
        pool_max,
        acquire_timeout,
    }))
}

fn read_server<G>(get: &G) -> Result<ServerSettings, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let bind_raw = get("MCP_BIND").unwrap_or_else(|| "0.0.0.0:8000".into());
    let bind = bind_raw
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::invalid("MCP_BIND", format!("{:?}: {}", bind_raw, e)))?;

    let api_key = if get("API_KEY_ENABLED").is_some_and(|v| parse_flag(&v)) {
        match get("MCP_API_KEY") {
            Some(key) => Some(SecretString::from(key)),
            None => {
                return Err(ConfigError::Missing {
                    var: "MCP_API_KEY".to_string(),
                });
            }
        }
    } else {
        None
    };

    let log_format = match get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
        None => LogFormat::Text,
        Some(v) if v == "text" => LogFormat::Text,
        Some(v) if v == "json" => LogFormat::Json,
        Some(other) => {
            return Err(ConfigError::invalid(
                "LOG_FORMAT",
                format!("{:?} is not text or json", other),
            ));
        }
    };

    Ok(ServerSettings {
        bind,
        api_key,
        log_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    const PG: &[(&str, &str)] = &[
        ("PGHOST", "db.internal"),
        ("PGDATABASE", "app"),
        ("PGUSER", "admin"),
        ("PGPASSWORD", "hunter2"),
    ];

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.notes_file, PathBuf::from("notes.txt"));
        assert_eq!(s.fs_root, PathBuf::from("."));
        assert_eq!(s.git.bin, "git");
        assert_eq!(s.git.timeout, Duration::from_secs(60));
        assert_eq!(s.server.bind.to_string(), "0.0.0.0:8000");
        assert!(s.server.api_key.is_none());
        assert_eq!(s.server.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_pg_disables_family() {
        let s = settings(&[("PGHOST", "localhost")]).unwrap();
        assert!(!s.has_postgres());
        assert_eq!(s.pg_missing.as_deref(), Some("PGDATABASE"));
    }

    #[test]
    fn test_pg_settings() {
        let s = settings(PG).unwrap();
        let pg = s.pg.unwrap();
        assert_eq!(pg.host, "db.internal");
        assert_eq!(pg.port, 5432);
        assert_eq!(pg.password.expose_secret(), "hunter2");
        assert_eq!(pg.ssl_mode, SslMode::Prefer);
        assert_eq!((pg.pool_min, pg.pool_max), (1, 5));
        assert_eq!(pg.acquire_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        let err = settings(&[("PGPORT", "fivefour")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PGPORT"));
    }

    #[test]
    fn test_invalid_sslmode_is_fatal() {
        assert!(settings(&[("PGSSLMODE", "sometimes")]).is_err());
        let s = settings(&[("PGSSLMODE", "verify-full")]).unwrap();
        assert!(s.pg.is_none());
    }

    #[test]
    fn test_pool_bounds() {
        assert!(settings(&[("PG_POOL_MIN", "6"), ("PG_POOL_MAX", "5")]).is_err());
        assert!(settings(&[("PG_POOL_MAX", "0"), ("PG_POOL_MIN", "0")]).is_err());
    }

    #[test]
    fn test_api_key_required_when_enabled() {
        let err = settings(&[("API_KEY_ENABLED", "true")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                var: "MCP_API_KEY".into()
            }
        );

        let s = settings(&[("API_KEY_ENABLED", "TRUE"), ("MCP_API_KEY", "k3y")]).unwrap();
        assert_eq!(s.server.api_key.unwrap().expose_secret(), "k3y");
    }

    #[test]
    fn test_api_key_ignored_when_disabled() {
        let s = settings(&[("API_KEY_ENABLED", "false"), ("MCP_API_KEY", "k3y")]).unwrap();
        assert!(s.server.api_key.is_none());
    }

    #[test]
    fn test_log_format() {
        let s = settings(&[("LOG_FORMAT", "JSON")]).unwrap();
        assert_eq!(s.server.log_format, LogFormat::Json);
        assert!(settings(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let s = settings(&[("NOTES_FILE", "  "), ("GIT_TIMEOUT_SECS", "")]).unwrap();
        assert_eq!(s.notes_file, PathBuf::from("notes.txt"));
        assert_eq!(s.git.timeout, Duration::from_secs(60));
    }
}
