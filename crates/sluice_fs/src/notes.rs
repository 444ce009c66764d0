//! Notes tools: a single append-only text file.

use async_trait::async_trait;
use serde_json::json;
use sluice_core::{confirmation, truncate_chars, Payload, ToolError, ToolResult};
use sluice_policy::{OperationSpec, ParamSpec, Rule};
use sluice_tool::{unknown_operation, Args, ToolSet};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const FAMILY: &str = "notes";

static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        params: &[ParamSpec::string("content")
            .required()
            .describe("Note text; stored as one line")],
        ..OperationSpec::safe(FAMILY, "add_note", "Append one note line to the notes file")
    },
    OperationSpec {
        params: &[ParamSpec::int("max_chars").default_int(20_000)],
        rules: &[Rule::ClampLimit {
            param: "max_chars",
            max: 1_000_000,
        }],
        ..OperationSpec::safe(FAMILY, "read_notes", "Read the notes file, truncated to max_chars")
    },
    OperationSpec {
        params: &[
            ParamSpec::string("query").required(),
            ParamSpec::int("max_results").default_int(50),
        ],
        rules: &[Rule::ClampLimit {
            param: "max_results",
            max: 1000,
        }],
        ..OperationSpec::safe(FAMILY, "search_notes", "Case-insensitive search of note lines")
    },
    OperationSpec::dangerous(FAMILY, "clear_notes", "Erase every note"),
];

/// Notes tool family
#[derive(Debug, Clone)]
pub struct NotesTools {
    path: PathBuf,
}

impl NotesTools {
    /// Notes stored at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Notes file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> ToolResult<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ToolError::from_io(self.path.display(), &e))
    }

    async fn add_note(&self, args: &Args) -> ToolResult<Payload> {
        let note = args.str("content")?.replace(['\r', '\n'], " ");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::from_io(parent.display(), &e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ToolError::from_io(self.path.display(), &e))?;
        file.write_all(format!("{}\n", note).as_bytes())
            .await
            .map_err(|e| ToolError::from_io(self.path.display(), &e))?;
        file.flush()
            .await
            .map_err(|e| ToolError::from_io(self.path.display(), &e))?;
        Ok(confirmation(format_args!("appended to {}", self.path.display())))
    }

    async fn read_notes(&self, args: &Args) -> ToolResult<Payload> {
        let max_chars = args.count("max_chars")?;
        let data = self.read_all().await?;
        let mut payload = truncate_chars(&data, max_chars).into_payload();
        payload["path"] = json!(self.path.display().to_string());
        Ok(payload)
    }

    async fn search_notes(&self, args: &Args) -> ToolResult<Payload> {
        let query = args.str("query")?.to_lowercase();
        let max_results = args.count("max_results")?;
        let data = self.read_all().await?;

        let hits: Vec<_> = data
            .lines()
            .enumerate()
            .filter(|(_, line)| line.to_lowercase().contains(&query))
            .collect();
        let total = hits.len();
        let matches: Vec<_> = hits
            .into_iter()
            .take(max_results)
            .map(|(idx, line)| json!({"line": idx + 1, "text": line}))
            .collect();
        Ok(json!({
            "matches": matches,
            "total": total,
            "truncated": total > max_results,
        }))
    }

    async fn clear_notes(&self) -> ToolResult<Payload> {
        tokio::fs::write(&self.path, b"")
            .await
            .map_err(|e| ToolError::from_io(self.path.display(), &e))?;
        Ok(confirmation(format_args!("cleared {}", self.path.display())))
    }
}

#[async_trait]
impl ToolSet for NotesTools {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn operations(&self) -> &'static [OperationSpec] {
        OPERATIONS
    }

    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload> {
        match operation {
            "add_note" => self.add_note(&args).await,
            "read_notes" => self.read_notes(&args).await,
            "search_notes" => self.search_notes(&args).await,
            "clear_notes" => self.clear_notes().await,
            other => Err(unknown_operation(FAMILY, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::{ErrorKind, FixedSwitch, Outcome};
    use sluice_policy::Gate;
    use sluice_tool::{Dispatcher, InvocationRequest, ToolRegistry};
    use std::sync::Arc;

    fn dispatcher(path: PathBuf, dangerous: bool) -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NotesTools::new(path))).unwrap();
        let gate = Gate::new(Arc::new(FixedSwitch::new(dangerous)), std::env::temp_dir());
        Dispatcher::new(Arc::new(registry), gate)
    }

    async fn call(d: &Dispatcher, op: &str, args: serde_json::Value) -> sluice_core::Response {
        d.invoke(InvocationRequest::new(op, args)).await
    }

    #[tokio::test]
    async fn test_add_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/notes.txt");
        let d = dispatcher(path.clone(), false);

        let resp = call(&d, "add_note", json!({"content": "  buy milk  "})).await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert!(resp.text().starts_with("OK: appended to"));
        call(&d, "add_note", json!({"content": "call bob"})).await;

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "buy milk\ncall bob\n"
        );

        let resp = call(&d, "read_notes", json!({})).await;
        assert_eq!(resp.payload["content"], json!("buy milk\ncall bob\n"));
        assert_eq!(resp.payload["truncated"], json!(false));
    }

    #[tokio::test]
    async fn test_blank_note_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path().join("notes.txt"), false);
        let resp = call(&d, "add_note", json!({"content": "   "})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_read_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "abcdefghij").unwrap();
        let d = dispatcher(path, false);

        let resp = call(&d, "read_notes", json!({"max_chars": 4})).await;
        assert_eq!(resp.payload["content"], json!("abcd"));
        assert_eq!(resp.payload["truncated"], json!(true));
        assert_eq!(resp.payload["total_chars"], json!(10));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path().join("absent.txt"), false);
        let resp = call(&d, "read_notes", json!({})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
    }

    #[tokio::test]
    async fn test_search_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Deploy Friday\nlunch\ndeploy monday\n").unwrap();
        let d = dispatcher(path, false);

        let resp = call(&d, "search_notes", json!({"query": "DEPLOY", "max_results": 1})).await;
        assert_eq!(resp.payload["total"], json!(2));
        assert_eq!(resp.payload["truncated"], json!(true));
        assert_eq!(resp.payload["matches"][0]["line"], json!(1));
    }

    #[tokio::test]
    async fn test_clear_requires_danger_switch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "keep me\n").unwrap();

        let resp = call(&dispatcher(path.clone(), false), "clear_notes", json!({})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Authorization.as_str()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me\n");

        let resp = call(&dispatcher(path.clone(), true), "clear_notes", json!({})).await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
