//! Resolution of caller-supplied paths against the filesystem root.

use std::path::{Path, PathBuf};

/// Resolve `raw` against `root`.
///
/// Absolute paths are returned unchanged; relative paths are joined onto the
/// root. `.` components are dropped. No sandboxing is applied.
#[must_use]
pub fn resolve(root: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    joined
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// Kind of object found at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symlink, socket, device and the rest
    Other,
}

impl EntryType {
    /// Classify file metadata
    #[must_use]
    pub fn of(meta: &std::fs::Metadata) -> Self {
        if meta.is_dir() {
            Self::Directory
        } else if meta.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Name used in payloads and error messages
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Other => "other",
        }
    }
}

/// Path of `path` relative to `base`, with forward slashes
#[must_use]
pub fn relative_display(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let text = rel.to_string_lossy().replace('\\', "/");
    if text.is_empty() {
        ".".to_string()
    } else {
        text
    }
}
