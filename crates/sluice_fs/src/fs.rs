//! Filesystem tools.
//!
//! Paths are resolved against the configured root; absolute paths are used
//! as given. Existence and type checks happen in the gate (`PathIs`,
//! `PathAbsent` rules), so handlers here only report what the OS says.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use similar::TextDiff;
use sluice_core::path::{self, relative_display, EntryType};
use sluice_core::{confirmation, truncate_chars, Payload, ToolError, ToolResult};
use sluice_policy::{OperationSpec, ParamSpec, PathKind, Rule};
use sluice_tool::{unknown_operation, Args, ToolSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;

use crate::walk;

const FAMILY: &str = "fs";

const fn path_is(param: &'static str, kind: PathKind) -> Rule {
    Rule::PathIs { param, kind }
}

const fn clamp(param: &'static str, max: u64) -> Rule {
    Rule::ClampLimit { param, max }
}

static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::int("max_chars").default_int(100_000),
        ],
        rules: &[path_is("path", PathKind::File), clamp("max_chars", 1_000_000)],
        ..OperationSpec::safe(FAMILY, "fs_read_file", "Read a text file, truncated to max_chars")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::int("start").default_int(1).describe("1-based first line"),
            ParamSpec::int("count").default_int(100),
        ],
        rules: &[
            path_is("path", PathKind::File),
            Rule::Positive("start"),
            clamp("count", 5000),
        ],
        ..OperationSpec::safe(FAMILY, "fs_read_lines", "Read a numbered range of lines")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::int("lines").default_int(20),
        ],
        rules: &[path_is("path", PathKind::File), clamp("lines", 5000)],
        ..OperationSpec::safe(FAMILY, "fs_head", "First lines of a file")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::int("lines").default_int(20),
        ],
        rules: &[path_is("path", PathKind::File), clamp("lines", 5000)],
        ..OperationSpec::safe(FAMILY, "fs_tail", "Last lines of a file")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        rules: &[path_is("path", PathKind::File)],
        ..OperationSpec::safe(FAMILY, "fs_count_lines", "Count lines, words, characters and bytes")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        rules: &[path_is("path", PathKind::Any)],
        ..OperationSpec::safe(FAMILY, "fs_stat", "Type, size, modification time and readonly flag")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        ..OperationSpec::safe(FAMILY, "fs_exists", "Whether a path exists, and its type")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").default_str("."),
            ParamSpec::boolean("include_hidden").default_bool(false),
        ],
        rules: &[path_is("path", PathKind::Dir)],
        ..OperationSpec::safe(FAMILY, "fs_list_directory", "Sorted directory entries with type and size")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").default_str("."),
            ParamSpec::int("max_depth").default_int(3),
            ParamSpec::int("max_entries").default_int(500),
        ],
        rules: &[
            path_is("path", PathKind::Dir),
            clamp("max_depth", 20),
            clamp("max_entries", 10_000),
        ],
        ..OperationSpec::safe(FAMILY, "fs_tree", "Indented tree listing, honouring .gitignore")
    },
    OperationSpec {
        params: &[
            ParamSpec::string("pattern").required().describe("Glob, e.g. *.rs or src/**/*.toml"),
            ParamSpec::path("path").default_str("."),
            ParamSpec::int("max_results").default_int(200),
        ],
        rules: &[path_is("path", PathKind::Dir), clamp("max_results", 5000)],
        ..OperationSpec::safe(FAMILY, "fs_search_files", "Find files by glob pattern")
    },
    OperationSpec {
        params: &[
            ParamSpec::string("pattern").required().describe("Regular expression"),
            ParamSpec::path("path").default_str("."),
            ParamSpec::int("max_results").default_int(200),
        ],
        rules: &[path_is("path", PathKind::Any), clamp("max_results", 5000)],
        ..OperationSpec::safe(FAMILY, "fs_grep", "Search file contents by regular expression")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").default_str("."),
            ParamSpec::int("min_bytes").default_int(1_048_576),
            ParamSpec::int("max_results").default_int(50),
        ],
        rules: &[path_is("path", PathKind::Dir), clamp("max_results", 1000)],
        ..OperationSpec::safe(FAMILY, "fs_find_large_files", "Largest files first")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").default_str("."),
            ParamSpec::int("max_results").default_int(50),
        ],
        rules: &[path_is("path", PathKind::Dir), clamp("max_results", 1000)],
        ..OperationSpec::safe(FAMILY, "fs_recent_files", "Most recently modified files first")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").default_str(".")],
        rules: &[path_is("path", PathKind::Any)],
        ..OperationSpec::safe(FAMILY, "fs_disk_usage", "Total bytes, files and directories")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        rules: &[path_is("path", PathKind::File)],
        ..OperationSpec::safe(FAMILY, "fs_file_hash", "SHA-256 of a file")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("left").required(),
            ParamSpec::path("right").required(),
            ParamSpec::int("max_chars").default_int(100_000),
        ],
        rules: &[
            path_is("left", PathKind::File),
            path_is("right", PathKind::File),
            clamp("max_chars", 1_000_000),
        ],
        ..OperationSpec::safe(FAMILY, "fs_diff_files", "Unified diff of two text files")
    },
    OperationSpec::safe(FAMILY, "fs_working_directory", "Absolute filesystem root"),
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::string("content").required().verbatim(),
            ParamSpec::boolean("overwrite").default_bool(false),
            ParamSpec::boolean("create_dirs").default_bool(false),
        ],
        ..OperationSpec::dangerous(FAMILY, "fs_write_file", "Write a file")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::string("content").required().verbatim(),
        ],
        ..OperationSpec::dangerous(FAMILY, "fs_append_file", "Append to a file, creating it if needed")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        ..OperationSpec::dangerous(FAMILY, "fs_touch", "Create an empty file or update its modification time")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::boolean("parents").default_bool(true),
        ],
        ..OperationSpec::dangerous(FAMILY, "fs_create_directory", "Create a directory")
    },
    OperationSpec {
        params: &[ParamSpec::path("path").required()],
        rules: &[path_is("path", PathKind::File)],
        ..OperationSpec::dangerous(FAMILY, "fs_delete_file", "Delete a file")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::boolean("recursive").default_bool(false),
        ],
        rules: &[path_is("path", PathKind::Dir)],
        ..OperationSpec::dangerous(FAMILY, "fs_delete_directory", "Delete a directory")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("source").required(),
            ParamSpec::path("destination").required(),
        ],
        rules: &[
            path_is("source", PathKind::Any),
            Rule::PathAbsent("destination"),
        ],
        ..OperationSpec::dangerous(FAMILY, "fs_move", "Move or rename a file or directory")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("source").required(),
            ParamSpec::path("destination").required(),
            ParamSpec::boolean("recursive").default_bool(false),
        ],
        rules: &[
            path_is("source", PathKind::Any),
            Rule::PathAbsent("destination"),
        ],
        ..OperationSpec::dangerous(FAMILY, "fs_copy", "Copy a file, or a directory with recursive=true")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::string("find").required().verbatim(),
            ParamSpec::string("replace").verbatim().default_str(""),
            ParamSpec::int("max_replacements")
                .default_int(0)
                .describe("0 replaces every occurrence"),
        ],
        rules: &[path_is("path", PathKind::File)],
        ..OperationSpec::dangerous(FAMILY, "fs_replace_in_file", "Literal find-and-replace in a file")
    },
    OperationSpec {
        params: &[
            ParamSpec::path("path").required(),
            ParamSpec::boolean("readonly").required(),
        ],
        rules: &[path_is("path", PathKind::Any)],
        ..OperationSpec::dangerous(FAMILY, "fs_set_readonly", "Set or clear the readonly flag")
    },
];

/// Format a timestamp as RFC 3339 UTC
#[must_use]
pub fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> ToolError + '_ {
    move |e| ToolError::from_io(path.display(), &e)
}

async fn blocking<T, F>(f: F) -> ToolResult<T>
where
    F: FnOnce() -> ToolResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolError::upstream("filesystem", e.to_string()))?
}

fn numbered(lines: &[&str], first_line: usize) -> Vec<Value> {
    lines
        .iter()
        .enumerate()
        .map(|(i, text)| json!({"line": first_line + i, "text": text}))
        .collect()
}

/// Filesystem tool family
#[derive(Debug, Clone)]
pub struct FsTools {
    root: PathBuf,
}

impl FsTools {
    /// Tools resolving relative paths against `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        path::resolve(&self.root, raw)
    }

    fn display(&self, path: &Path) -> String {
        relative_display(&self.root, path)
    }

    async fn read_text(&self, path: &Path) -> ToolResult<String> {
        let bytes = tokio::fs::read(path).await.map_err(io_err(path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn read_file(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let text = self.read_text(&target).await?;
        let mut payload = truncate_chars(&text, args.count("max_chars")?).into_payload();
        payload["path"] = json!(self.display(&target));
        Ok(payload)
    }

    async fn read_lines(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let start = args.count("start")?;
        let count = args.count("count")?;
        let text = self.read_text(&target).await?;
        let all: Vec<&str> = text.lines().collect();
        let from = (start - 1).min(all.len());
        let to = from.saturating_add(count).min(all.len());
        Ok(json!({
            "path": self.display(&target),
            "lines": numbered(&all[from..to], from + 1),
            "total_lines": all.len(),
            "truncated": to < all.len(),
        }))
    }

    async fn head_or_tail(&self, args: &Args, tail: bool) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let n = args.count("lines")?;
        let text = self.read_text(&target).await?;
        let all: Vec<&str> = text.lines().collect();
        let (from, to) = if tail {
            (all.len().saturating_sub(n), all.len())
        } else {
            (0, n.min(all.len()))
        };
        Ok(json!({
            "path": self.display(&target),
            "lines": numbered(&all[from..to], from + 1),
            "total_lines": all.len(),
            "truncated": to - from < all.len(),
        }))
    }

    async fn count_lines(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let bytes = tokio::fs::read(&target).await.map_err(io_err(&target))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(json!({
            "path": self.display(&target),
            "lines": text.lines().count(),
            "words": text.split_whitespace().count(),
            "chars": text.chars().count(),
            "bytes": bytes.len(),
        }))
    }

    async fn stat(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let meta = tokio::fs::metadata(&target).await.map_err(io_err(&target))?;
        let modified = meta.modified().ok().map(rfc3339);
        Ok(json!({
            "path": self.display(&target),
            "type": EntryType::of(&meta).as_str(),
            "size": meta.len(),
            "modified": modified,
            "readonly": meta.permissions().readonly(),
        }))
    }

    async fn exists(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let payload = match tokio::fs::metadata(&target).await {
            Ok(meta) => json!({"exists": true, "type": EntryType::of(&meta).as_str()}),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                json!({"exists": false, "type": null})
            }
            Err(e) => return Err(ToolError::from_io(target.display(), &e)),
        };
        Ok(payload)
    }

    async fn list_directory(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let include_hidden = args.flag("include_hidden");
        let mut reader = tokio::fs::read_dir(&target).await.map_err(io_err(&target))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(io_err(&target))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !include_hidden && name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await.map_err(io_err(&entry.path()))?;
            entries.push((name, EntryType::of(&meta), meta.len()));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let listed: Vec<Value> = entries
            .into_iter()
            .map(|(name, kind, size)| json!({"name": name, "type": kind.as_str(), "size": size}))
            .collect();
        Ok(json!({
            "path": self.display(&target),
            "count": listed.len(),
            "entries": listed,
        }))
    }

    async fn tree(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let depth = args.count("max_depth")?;
        let max_entries = args.count("max_entries")?;
        let mut payload = blocking(move || walk::tree(&target, depth, max_entries)).await?;
        payload["path"] = json!(args.str("path")?);
        Ok(payload)
    }

    async fn search_files(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let pattern = args.str("pattern")?.to_string();
        let max = args.count("max_results")?;
        blocking(move || walk::search(&target, &pattern, max)).await
    }

    async fn grep(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let base = self.root.clone();
        let pattern = args.str("pattern")?.to_string();
        let max = args.count("max_results")?;
        blocking(move || walk::grep(&target, &base, &pattern, max)).await
    }

    async fn find_large_files(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let min_bytes = args.count("min_bytes")? as u64;
        let max = args.count("max_results")?;
        blocking(move || walk::large_files(&target, min_bytes, max)).await
    }

    async fn recent_files(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let max = args.count("max_results")?;
        blocking(move || walk::recent_files(&target, max)).await
    }

    async fn disk_usage(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let label = self.display(&target);
        let mut payload = blocking(move || walk::disk_usage(&target)).await?;
        payload["path"] = json!(label);
        Ok(payload)
    }

    async fn file_hash(&self, args: &Args) -> ToolResult<Payload> {
        let target = self.resolve(args.str("path")?);
        let bytes = tokio::fs::read(&target).await.map_err(io_err(&target))?;
        let digest = Sha256::digest(&bytes);
        Ok(json!({
            "path": self.display(&target),
            "algorithm": "sha256",
            "hash": hex::encode(digest),
            "bytes": bytes.len(),
        }))
    }

    async fn diff_files(&self, args: &Args) -> ToolResult<Payload> {
        let left_raw = args.str("left")?;
        let right_raw = args.str("right")?;
        let left = self.read_text(&self.resolve(left_raw)).await?;
        let right = self.read_text(&self.resolve(right_raw)).await?;
        let diff = TextDiff::from_lines(&left, &right)
            .unified_diff()
            .context_radius(3)
            .header(left_raw, right_raw)
            .to_string();
        let identical = diff.is_empty();
        let mut payload = truncate_chars(&diff, args.count("max_chars")?).into_payload();
        payload["identical"] = json!(identical);
        Ok(payload)
    }

    async fn working_directory(&self) -> ToolResult<Payload> {
        let absolute = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(io_err(&self.root))?;
        Ok(json!({"path": absolute.display().to_string()}))
    }

    async fn write_file(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let content = args.str("content")?;

        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => {
                return Err(ToolError::type_mismatch(raw, "file", "directory"));
            }
            Ok(_) if !args.flag("overwrite") => {
                return Err(ToolError::conflict(format!(
                    "{} already exists (set overwrite=true to replace it)",
                    raw
                )));
            }
            _ => {}
        }
        if args.flag("create_dirs") {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
            }
        }
        tracing::debug!(path = %target.display(), bytes = content.len(), "writing file");
        tokio::fs::write(&target, content.as_bytes())
            .await
            .map_err(io_err(&target))?;
        Ok(confirmation(format_args!(
            "wrote {} bytes to {}",
            content.len(),
            raw
        )))
    }

    async fn append_file(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let content = args.str("content")?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .await
            .map_err(io_err(&target))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(io_err(&target))?;
        file.flush().await.map_err(io_err(&target))?;
        Ok(confirmation(format_args!(
            "appended {} bytes to {}",
            content.len(),
            raw
        )))
    }

    async fn touch(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?.to_string();
        let target = self.resolve(&raw);
        blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&target)
                .map_err(|e| ToolError::from_io(target.display(), &e))?;
            file.set_modified(SystemTime::now())
                .map_err(|e| ToolError::from_io(target.display(), &e))?;
            Ok(confirmation(format_args!("touched {}", raw)))
        })
        .await
    }

    async fn create_directory(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let result = if args.flag("parents") {
            tokio::fs::create_dir_all(&target).await
        } else {
            tokio::fs::create_dir(&target).await
        };
        result.map_err(io_err(&target))?;
        Ok(confirmation(format_args!("created directory {}", raw)))
    }

    async fn delete_file(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        tokio::fs::remove_file(&target).await.map_err(io_err(&target))?;
        Ok(confirmation(format_args!("deleted {}", raw)))
    }

    async fn delete_directory(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let root = tokio::fs::canonicalize(&self.root).await.ok();
        let canonical = tokio::fs::canonicalize(&target).await.ok();
        if root.is_some() && root == canonical {
            return Err(ToolError::validation("path", "refusing to delete the filesystem root"));
        }
        tracing::debug!(path = %target.display(), recursive = args.flag("recursive"), "removing directory");
        let removed = if args.flag("recursive") {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_dir(&target).await
        };
        removed.map_err(|e| match e.kind() {
            std::io::ErrorKind::DirectoryNotEmpty => ToolError::conflict(format!(
                "{} is not empty (set recursive=true to delete its contents)",
                raw
            )),
            _ => ToolError::from_io(raw, &e),
        })?;
        Ok(confirmation(format_args!("deleted directory {}", raw)))
    }

    async fn move_path(&self, args: &Args) -> ToolResult<Payload> {
        let source_raw = args.str("source")?;
        let dest_raw = args.str("destination")?;
        let source = self.resolve(source_raw);
        let dest = self.resolve(dest_raw);
        tokio::fs::rename(&source, &dest).await.map_err(io_err(&source))?;
        Ok(confirmation(format_args!("moved {} to {}", source_raw, dest_raw)))
    }

    async fn copy_path(&self, args: &Args) -> ToolResult<Payload> {
        let source_raw = args.str("source")?.to_string();
        let dest_raw = args.str("destination")?.to_string();
        let source = self.resolve(&source_raw);
        let dest = self.resolve(&dest_raw);
        let meta = tokio::fs::metadata(&source).await.map_err(io_err(&source))?;
        if meta.is_dir() {
            if !args.flag("recursive") {
                return Err(ToolError::validation(
                    "recursive",
                    format!("{} is a directory; set recursive=true to copy it", source_raw),
                ));
            }
            let copied = blocking(move || walk::copy_tree(&source, &dest)).await?;
            return Ok(confirmation(format_args!(
                "copied {} files from {} to {}",
                copied, source_raw, dest_raw
            )));
        }
        let bytes = tokio::fs::copy(&source, &dest).await.map_err(io_err(&dest))?;
        Ok(confirmation(format_args!(
            "copied {} bytes from {} to {}",
            bytes, source_raw, dest_raw
        )))
    }

    async fn replace_in_file(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let find = args.str("find")?;
        let replace = args.opt_str("replace").unwrap_or("");
        let limit = args.count("max_replacements")?;
        if find.is_empty() {
            return Err(ToolError::validation("find", "must not be empty"));
        }

        let text = tokio::fs::read_to_string(&target).await.map_err(io_err(&target))?;
        let occurrences = text.matches(find).count();
        if occurrences == 0 {
            return Err(ToolError::not_found("text", format!("{:?} in {}", find, raw)));
        }
        let (updated, replaced) = if limit == 0 {
            (text.replace(find, replace), occurrences)
        } else {
            (text.replacen(find, replace, limit), occurrences.min(limit))
        };
        tokio::fs::write(&target, updated)
            .await
            .map_err(io_err(&target))?;
        Ok(json!({
            "path": raw,
            "replacements": replaced,
            "occurrences": occurrences,
        }))
    }

    async fn set_readonly(&self, args: &Args) -> ToolResult<Payload> {
        let raw = args.str("path")?;
        let target = self.resolve(raw);
        let readonly = args.flag("readonly");
        let meta = tokio::fs::metadata(&target).await.map_err(io_err(&target))?;
        let mut perms = meta.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(readonly);
        tokio::fs::set_permissions(&target, perms)
            .await
            .map_err(io_err(&target))?;
        Ok(confirmation(format_args!(
            "{} is now {}",
            raw,
            if readonly { "readonly" } else { "writable" }
        )))
    }
}

#[async_trait]
impl ToolSet for FsTools {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn operations(&self) -> &'static [OperationSpec] {
        OPERATIONS
    }

    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload> {
        match operation {
            "fs_read_file" => self.read_file(&args).await,
            "fs_read_lines" => self.read_lines(&args).await,
            "fs_head" => self.head_or_tail(&args, false).await,
            "fs_tail" => self.head_or_tail(&args, true).await,
            "fs_count_lines" => self.count_lines(&args).await,
            "fs_stat" => self.stat(&args).await,
            "fs_exists" => self.exists(&args).await,
            "fs_list_directory" => self.list_directory(&args).await,
            "fs_tree" => self.tree(&args).await,
            "fs_search_files" => self.search_files(&args).await,
            "fs_grep" => self.grep(&args).await,
            "fs_find_large_files" => self.find_large_files(&args).await,
            "fs_recent_files" => self.recent_files(&args).await,
            "fs_disk_usage" => self.disk_usage(&args).await,
            "fs_file_hash" => self.file_hash(&args).await,
            "fs_diff_files" => self.diff_files(&args).await,
            "fs_working_directory" => self.working_directory().await,
            "fs_write_file" => self.write_file(&args).await,
            "fs_append_file" => self.append_file(&args).await,
            "fs_touch" => self.touch(&args).await,
            "fs_create_directory" => self.create_directory(&args).await,
            "fs_delete_file" => self.delete_file(&args).await,
            "fs_delete_directory" => self.delete_directory(&args).await,
            "fs_move" => self.move_path(&args).await,
            "fs_copy" => self.copy_path(&args).await,
            "fs_replace_in_file" => self.replace_in_file(&args).await,
            "fs_set_readonly" => self.set_readonly(&args).await,
            other => Err(unknown_operation(FAMILY, other)),
        }
    }
}
