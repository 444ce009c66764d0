//! Settings to registry to dispatcher.

use sluice_core::{DangerSwitch, Settings};
use sluice_fs::{FsTools, NotesTools};
use sluice_git::{GitTools, ProcessGitRunner};
use sluice_pg::{PgExecutor, PgTools};
use sluice_policy::Gate;
use sluice_tool::{Dispatcher, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ServerError;

fn fs_root(settings: &Settings) -> Result<PathBuf, ServerError> {
    let root = std::fs::canonicalize(&settings.fs_root).map_err(|source| ServerError::FsRoot {
        path: settings.fs_root.display().to_string(),
        source,
    })?;
    if !root.is_dir() {
        return Err(ServerError::FsRoot {
            path: root.display().to_string(),
            source: std::io::Error::other("not a directory"),
        });
    }
    Ok(root)
}

/// Register every available tool family.
///
/// The SQL family is skipped with a warning when its settings are
/// incomplete, unless `require_postgres` is set.
///
/// # Errors
///
/// Returns an error for an unusable `FS_ROOT`, missing SQL settings under
/// `require_postgres`, or an inconsistent descriptor table.
pub fn build_registry(settings: &Settings, require_postgres: bool) -> Result<ToolRegistry, ServerError> {
    let root = fs_root(settings)?;
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(NotesTools::new(&settings.notes_file)))?;
    registry.register(Arc::new(FsTools::new(&root)))?;
    let runner = Arc::new(ProcessGitRunner::from_settings(&settings.git));
    registry.register(Arc::new(GitTools::new(&root, runner)))?;

    match &settings.pg {
        Some(pg) => {
            let executor = Arc::new(PgExecutor::connect_lazy(pg));
            registry.register(Arc::new(PgTools::new(executor, pg.database.clone())))?;
        }
        None => {
            let var = settings
                .pg_missing
                .clone()
                .unwrap_or_else(|| "PGHOST".to_string());
            if require_postgres {
                return Err(ServerError::PostgresRequired { var });
            }
            tracing::warn!(missing = %var, "PostgreSQL settings incomplete; pg tools disabled");
        }
    }

    tracing::info!(
        operations = registry.len(),
        families = ?registry.families(),
        fs_root = %root.display(),
        "tool catalog ready"
    );
    Ok(registry)
}

/// Build the dispatcher every transport shares
///
/// # Errors
///
/// See [`build_registry`].
pub fn build_dispatcher(
    settings: &Settings,
    switch: Arc<dyn DangerSwitch>,
    require_postgres: bool,
) -> Result<Dispatcher, ServerError> {
    let registry = build_registry(settings, require_postgres)?;
    let gate = Gate::new(switch, fs_root(settings)?);
    if gate.dangerous_allowed() {
        tracing::warn!("dangerous operations are ENABLED");
    }
    Ok(Dispatcher::new(Arc::new(registry), gate))
}
