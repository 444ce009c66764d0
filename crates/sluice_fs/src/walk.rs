//! Directory walks behind the listing and search tools.
//!
//! All walks skip hidden entries and honour `.gitignore` files, except the
//! disk usage walk which counts everything. These functions block; callers
//! run them on the blocking pool.

use ignore::WalkBuilder;
use regex::Regex;
use serde_json::{json, Value};
use sluice_core::path::relative_display;
use sluice_core::{ToolError, ToolResult};
use std::path::Path;
use std::time::SystemTime;

/// Longest grep line returned, in characters
const MAX_MATCH_LINE_CHARS: usize = 500;

fn walker(root: &Path) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    builder
}

fn walk_error(err: ignore::Error) -> ToolError {
    match err.io_error().map(std::io::Error::kind) {
        Some(std::io::ErrorKind::NotFound) => ToolError::not_found("path", err.to_string()),
        _ => ToolError::upstream("filesystem", err.to_string()),
    }
}

/// Indented tree listing, directories suffixed with `/`
///
/// # Errors
///
/// Returns an error if the root cannot be read.
pub fn tree(root: &Path, max_depth: usize, max_entries: usize) -> ToolResult<Value> {
    let mut lines = Vec::new();
    let mut total = 0usize;
    for entry in walker(root).max_depth(Some(max_depth)).build() {
        let entry = entry.map_err(walk_error)?;
        if entry.depth() == 0 {
            continue;
        }
        total += 1;
        if lines.len() >= max_entries {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        let indent = "  ".repeat(entry.depth() - 1);
        lines.push(if is_dir {
            format!("{}{}/", indent, name)
        } else {
            format!("{}{}", indent, name)
        });
    }
    Ok(json!({
        "tree": lines.join("\n"),
        "entries": lines.len(),
        "total": total,
        "truncated": total > lines.len(),
    }))
}

/// Relative paths of files matching a glob.
///
/// Patterns containing `/` match the path relative to `root`; others match
/// the file name only.
///
/// # Errors
///
/// Returns a validation error for a malformed pattern.
pub fn search(root: &Path, pattern: &str, max_results: usize) -> ToolResult<Value> {
    let glob = glob::Pattern::new(pattern)
        .map_err(|e| ToolError::validation("pattern", format!("invalid glob: {}", e)))?;
    let against_path = pattern.contains('/');

    let mut found = Vec::new();
    let mut total = 0usize;
    for entry in walker(root).build() {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = relative_display(root, entry.path());
        let hit = if against_path {
            glob.matches(&rel)
        } else {
            glob.matches(&entry.file_name().to_string_lossy())
        };
        if hit {
            total += 1;
            if found.len() < max_results {
                found.push(rel);
            }
        }
    }
    Ok(json!({
        "files": found,
        "total": total,
        "truncated": total > max_results,
    }))
}

/// Regex matches across files under `root` (or in `root` itself if a file)
///
/// # Errors
///
/// Returns a validation error for a malformed pattern.
pub fn grep(root: &Path, base: &Path, pattern: &str, max_results: usize) -> ToolResult<Value> {
    let regex = Regex::new(pattern)
        .map_err(|e| ToolError::validation("pattern", format!("invalid regex: {}", e)))?;

    let mut matches = Vec::new();
    let mut truncated = false;
    'files: for entry in walker(root).build() {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        // Binary and non-UTF-8 files are skipped.
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        for (idx, line) in text.lines().enumerate() {
            if !regex.is_match(line) {
                continue;
            }
            if matches.len() >= max_results {
                truncated = true;
                break 'files;
            }
            let shown: String = line.chars().take(MAX_MATCH_LINE_CHARS).collect();
            matches.push(json!({
                "path": relative_display(base, entry.path()),
                "line": idx + 1,
                "text": shown,
            }));
        }
    }
    Ok(json!({
        "count": matches.len(),
        "matches": matches,
        "truncated": truncated,
    }))
}

struct FileInfo {
    rel: String,
    size: u64,
    modified: SystemTime,
}

fn files(root: &Path) -> ToolResult<Vec<FileInfo>> {
    let mut out = Vec::new();
    for entry in walker(root).build() {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        out.push(FileInfo {
            rel: relative_display(root, entry.path()),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(out)
}

/// Files of at least `min_bytes`, largest first
///
/// # Errors
///
/// Returns an error if the root cannot be read.
pub fn large_files(root: &Path, min_bytes: u64, max_results: usize) -> ToolResult<Value> {
    let mut big: Vec<FileInfo> = files(root)?
        .into_iter()
        .filter(|f| f.size >= min_bytes)
        .collect();
    big.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.rel.cmp(&b.rel)));
    let total = big.len();
    let listed: Vec<Value> = big
        .into_iter()
        .take(max_results)
        .map(|f| json!({"path": f.rel, "size": f.size}))
        .collect();
    Ok(json!({
        "files": listed,
        "total": total,
        "truncated": total > max_results,
    }))
}

/// Most recently modified files first
///
/// # Errors
///
/// Returns an error if the root cannot be read.
pub fn recent_files(root: &Path, max_results: usize) -> ToolResult<Value> {
    let mut all = files(root)?;
    all.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.rel.cmp(&b.rel)));
    let total = all.len();
    let listed: Vec<Value> = all
        .into_iter()
        .take(max_results)
        .map(|f| {
            json!({
                "path": f.rel,
                "size": f.size,
                "modified": crate::fs::rfc3339(f.modified),
            })
        })
        .collect();
    Ok(json!({
        "files": listed,
        "total": total,
        "truncated": total > max_results,
    }))
}

/// Total bytes, files and directories under `root`, hidden entries included
///
/// # Errors
///
/// Returns an error if the root cannot be read.
pub fn disk_usage(root: &Path) -> ToolResult<Value> {
    let (mut bytes, mut file_count, mut dir_count) = (0u64, 0u64, 0u64);
    for entry in WalkBuilder::new(root).standard_filters(false).build() {
        let entry = entry.map_err(walk_error)?;
        let Some(kind) = entry.file_type() else {
            continue;
        };
        if kind.is_dir() {
            if entry.depth() > 0 {
                dir_count += 1;
            }
        } else if kind.is_file() {
            file_count += 1;
            bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(json!({
        "bytes": bytes,
        "files": file_count,
        "directories": dir_count,
    }))
}

/// Copy a directory tree; returns the number of files copied
///
/// # Errors
///
/// Returns the first io failure.
pub fn copy_tree(source: &Path, destination: &Path) -> ToolResult<u64> {
    let mut copied = 0u64;
    for entry in WalkBuilder::new(source).standard_filters(false).build() {
        let entry = entry.map_err(walk_error)?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(rel);
        let Some(kind) = entry.file_type() else {
            continue;
        };
        if kind.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| ToolError::from_io(target.display(), &e))?;
        } else if kind.is_file() {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| ToolError::from_io(target.display(), &e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::write(root.join("README.md"), "hello\nworld\n").unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}\n// TODO later\n").unwrap();
        std::fs::write(root.join("src/nested/lib.rs"), "pub fn x() {}\n").unwrap();
        std::fs::write(root.join(".hidden"), "secret").unwrap();
        std::fs::write(root.join("big.bin"), vec![0u8; 4096]).unwrap();
        dir
    }

    #[test]
    fn test_tree_depth_and_order() {
        let dir = fixture();
        let out = tree(dir.path(), 1, 100).unwrap();
        assert_eq!(out["tree"], json!("README.md\nbig.bin\nsrc/"));
        assert_eq!(out["truncated"], json!(false));
    }

    #[test]
    fn test_tree_truncation() {
        let dir = fixture();
        let out = tree(dir.path(), 5, 2).unwrap();
        assert_eq!(out["entries"], json!(2));
        assert_eq!(out["truncated"], json!(true));
    }

    #[test]
    fn test_search_by_name_and_path() {
        let dir = fixture();
        let out = search(dir.path(), "*.rs", 10).unwrap();
        assert_eq!(out["files"], json!(["src/main.rs", "src/nested/lib.rs"]));

        let out = search(dir.path(), "src/*.rs", 10).unwrap();
        assert_eq!(out["files"], json!(["src/main.rs"]));

        assert!(search(dir.path(), "[", 10).is_err());
    }

    #[test]
    fn test_grep() {
        let dir = fixture();
        let out = grep(dir.path(), dir.path(), "TODO", 10).unwrap();
        assert_eq!(out["count"], json!(1));
        assert_eq!(out["matches"][0]["path"], json!("src/main.rs"));
        assert_eq!(out["matches"][0]["line"], json!(2));
        assert!(grep(dir.path(), dir.path(), "(", 10).is_err());
    }

    #[test]
    fn test_large_files() {
        let dir = fixture();
        let out = large_files(dir.path(), 1024, 10).unwrap();
        assert_eq!(out["files"], json!([{"path": "big.bin", "size": 4096}]));
    }

    #[test]
    fn test_disk_usage_counts_hidden() {
        let dir = fixture();
        let out = disk_usage(dir.path()).unwrap();
        assert_eq!(out["files"], json!(5));
        assert_eq!(out["directories"], json!(2));
    }

    #[test]
    fn test_copy_tree() {
        let dir = fixture();
        let dest = dir.path().join("copy");
        let copied = copy_tree(&dir.path().join("src"), &dest).unwrap();
        assert_eq!(copied, 2);
        assert!(dest.join("nested/lib.rs").exists());
    }
}
