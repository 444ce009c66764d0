//! Git tool family.
//!
//! Every operation shells out through a [`GitRunner`]. Refs are validated
//! by the gate so they can never start with `-`, and user paths always
//! follow `--`.

use async_trait::async_trait;
use serde_json::{json, Value};
use sluice_core::path;
use sluice_core::{confirmation, truncate_chars, Payload, ToolError, ToolResult};
use sluice_policy::{OperationSpec, ParamSpec, ParamType, PathKind, Rule};
use sluice_tool::{unknown_operation, Args, ToolSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::runner::{git_error, GitOutput, GitRunner};

const FAMILY: &str = "git";

const REPO: ParamSpec = ParamSpec::path("repo_path")
    .default_str(".")
    .describe("Repository directory, relative to the filesystem root");
const REPO_IS_DIR: Rule = Rule::PathIs {
    param: "repo_path",
    kind: PathKind::Dir,
};
const MAX_CHARS: ParamSpec = ParamSpec::int("max_chars").default_int(100_000);
const CLAMP_CHARS: Rule = Rule::ClampLimit {
    param: "max_chars",
    max: 1_000_000,
};
const REMOTE: ParamSpec = ParamSpec::git_ref("remote").default_str("origin");

static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_status", "Branch and changed files")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::int("max_count").default_int(20),
            ParamSpec::git_ref("rev"),
            ParamSpec::string("path").describe("Limit history to this path"),
        ],
        rules: &[
            REPO_IS_DIR,
            Rule::ClampLimit {
                param: "max_count",
                max: 500,
            },
        ],
        ..OperationSpec::safe(FAMILY, "git_log", "Recent commits")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::boolean("staged").default_bool(false),
            ParamSpec::git_ref("rev"),
            ParamSpec::string("path"),
            MAX_CHARS,
        ],
        rules: &[REPO_IS_DIR, CLAMP_CHARS],
        ..OperationSpec::safe(FAMILY, "git_diff", "Working tree, staged or revision diff")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::git_ref("rev").required(), MAX_CHARS],
        rules: &[REPO_IS_DIR, CLAMP_CHARS],
        ..OperationSpec::safe(FAMILY, "git_show", "Show a commit or object")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::string("path").required(), MAX_CHARS],
        rules: &[REPO_IS_DIR, CLAMP_CHARS],
        ..OperationSpec::safe(FAMILY, "git_blame", "Line-by-line authorship of a file")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::boolean("all").default_bool(false)],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_branch_list", "Local branches, or all with all=true")
    },
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_current_branch", "Name of the checked out branch")
    },
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_remote_list", "Configured remotes and their URLs")
    },
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_tag_list", "Tags")
    },
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_stash_list", "Stash entries")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::git_ref("rev").required()],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::safe(FAMILY, "git_rev_parse", "Resolve a revision to a commit hash")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::git_ref("initial_branch")],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_init", "Create a repository")
    },
    OperationSpec {
        params: &[
            ParamSpec::string("url").required(),
            ParamSpec::path("destination").required(),
            ParamSpec::git_ref("branch"),
        ],
        rules: &[Rule::PathAbsent("destination")],
        ..OperationSpec::dangerous(FAMILY, "git_clone", "Clone a repository")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::new("paths", ParamType::Array).required()],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_add", "Stage paths")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::string("message").required().verbatim(),
            ParamSpec::boolean("all").default_bool(false),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_commit", "Record staged changes")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::git_ref("target").required()],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_checkout", "Switch to a branch or commit")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::git_ref("name").required(),
            ParamSpec::git_ref("start_point"),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_create_branch", "Create a branch")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::git_ref("name").required(),
            ParamSpec::boolean("force").default_bool(false),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_delete_branch", "Delete a branch")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::git_ref("branch").required(),
            ParamSpec::boolean("no_ff").default_bool(false),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_merge", "Merge a branch into the current one")
    },
    OperationSpec {
        params: &[REPO, REMOTE],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_fetch", "Fetch from a remote")
    },
    OperationSpec {
        params: &[REPO, REMOTE, ParamSpec::git_ref("branch")],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_pull", "Fetch and merge from a remote")
    },
    OperationSpec {
        params: &[
            REPO,
            REMOTE,
            ParamSpec::git_ref("branch"),
            ParamSpec::boolean("set_upstream").default_bool(false),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_push", "Push to a remote")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::string("mode").default_str("mixed"),
            ParamSpec::git_ref("target").default_str("HEAD"),
        ],
        rules: &[
            REPO_IS_DIR,
            Rule::OneOf {
                param: "mode",
                allowed: &["soft", "mixed", "hard"],
            },
        ],
        ..OperationSpec::dangerous(FAMILY, "git_reset", "Reset HEAD to a revision")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::new("paths", ParamType::Array).required(),
            ParamSpec::boolean("staged").default_bool(false),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_restore", "Discard changes, or unstage with staged=true")
    },
    OperationSpec {
        params: &[REPO, ParamSpec::string("message")],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_stash", "Stash working tree changes")
    },
    OperationSpec {
        params: &[REPO],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_stash_pop", "Apply and drop the latest stash")
    },
    OperationSpec {
        params: &[
            REPO,
            ParamSpec::git_ref("name").required(),
            ParamSpec::string("message").describe("Annotated tag message"),
            ParamSpec::git_ref("target"),
        ],
        rules: &[REPO_IS_DIR],
        ..OperationSpec::dangerous(FAMILY, "git_tag_create", "Create a tag")
    },
];

fn argv<const N: usize>(fixed: [&str; N]) -> Vec<String> {
    fixed.iter().map(|s| s.to_string()).collect()
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect()
}

/// Git tool family
pub struct GitTools {
    root: PathBuf,
    runner: Arc<dyn GitRunner>,
}

impl GitTools {
    /// Tools running git through `runner`, repositories resolved against `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn GitRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    fn repo(&self, args: &Args) -> ToolResult<PathBuf> {
        Ok(path::resolve(&self.root, args.str("repo_path")?))
    }

    async fn git(&self, args: &Args, argv: Vec<String>) -> ToolResult<GitOutput> {
        let repo = self.repo(args)?;
        self.git_in(repo, argv).await
    }

    async fn git_in(&self, dir: PathBuf, argv: Vec<String>) -> ToolResult<GitOutput> {
        let output = self.runner.run(&dir, &argv).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(git_error(&output))
        }
    }

    /// Run and report git's own message, or a confirmation when it printed nothing
    async fn mutate(&self, args: &Args, argv: Vec<String>, done: &str) -> ToolResult<Payload> {
        let output = self.git(args, argv).await?;
        let text = output.combined();
        if text.is_empty() {
            Ok(confirmation(done))
        } else {
            Ok(json!({"message": done, "output": text}))
        }
    }

    async fn text(&self, args: &Args, argv: Vec<String>) -> ToolResult<Payload> {
        let output = self.git(args, argv).await?;
        Ok(truncate_chars(&output.stdout, args.count("max_chars")?).into_payload())
    }

    async fn status(&self, args: &Args) -> ToolResult<Payload> {
        let output = self
            .git(args, argv(["status", "--porcelain=v1", "--branch"]))
            .await?;
        let mut branch = Value::Null;
        let mut entries = Vec::new();
        for line in non_empty_lines(&output.stdout) {
            if let Some(head) = line.strip_prefix("## ") {
                branch = json!(head);
            } else if line.len() > 3 {
                entries.push(json!({"status": line[..2].trim(), "path": &line[3..]}));
            }
        }
        Ok(json!({
            "branch": branch,
            "clean": entries.is_empty(),
            "entries": entries,
        }))
    }

    async fn log(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["log", "--pretty=format:%H%x1f%an%x1f%aI%x1f%s"]);
        cmd.push(format!("--max-count={}", args.count("max_count")?));
        if let Some(rev) = args.opt_str("rev") {
            cmd.push(rev.to_string());
        }
        cmd.push("--".into());
        if let Some(p) = args.opt_str("path") {
            cmd.push(p.to_string());
        }
        let output = self.git(args, cmd).await?;
        let commits: Vec<Value> = non_empty_lines(&output.stdout)
            .into_iter()
            .map(|line| {
                let mut fields = line.split('\u{1f}');
                json!({
                    "hash": fields.next().unwrap_or_default(),
                    "author": fields.next().unwrap_or_default(),
                    "date": fields.next().unwrap_or_default(),
                    "subject": fields.next().unwrap_or_default(),
                })
            })
            .collect();
        Ok(json!({"count": commits.len(), "commits": commits}))
    }

    async fn diff(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["diff"]);
        if args.flag("staged") {
            cmd.push("--cached".into());
        }
        if let Some(rev) = args.opt_str("rev") {
            cmd.push(rev.to_string());
        }
        cmd.push("--".into());
        if let Some(p) = args.opt_str("path") {
            cmd.push(p.to_string());
        }
        self.text(args, cmd).await
    }

    async fn branch_list(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["branch", "--format=%(HEAD)%(refname:short)"]);
        if args.flag("all") {
            cmd.push("--all".into());
        }
        let output = self.git(args, cmd).await?;
        let branches: Vec<Value> = non_empty_lines(&output.stdout)
            .into_iter()
            .map(|line| match line.strip_prefix('*') {
                Some(name) => json!({"name": name.trim(), "current": true}),
                None => json!({"name": line.trim(), "current": false}),
            })
            .collect();
        Ok(json!({"branches": branches}))
    }

    async fn remote_list(&self, args: &Args) -> ToolResult<Payload> {
        let output = self.git(args, argv(["remote", "-v"])).await?;
        let remotes: Vec<Value> = non_empty_lines(&output.stdout)
            .into_iter()
            .filter(|line| line.ends_with("(fetch)"))
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                Some(json!({"name": parts.next()?, "url": parts.next()?}))
            })
            .collect();
        Ok(json!({"remotes": remotes}))
    }

    async fn lines(&self, args: &Args, cmd: Vec<String>, key: &str) -> ToolResult<Payload> {
        let output = self.git(args, cmd).await?;
        let lines = non_empty_lines(&output.stdout);
        Ok(json!({ key: lines }))
    }

    async fn single(&self, args: &Args, cmd: Vec<String>, key: &str) -> ToolResult<Payload> {
        let output = self.git(args, cmd).await?;
        Ok(json!({ key: output.stdout.trim() }))
    }

    fn paths(args: &Args) -> ToolResult<Vec<String>> {
        let paths = args.strings("paths")?;
        if paths.is_empty() {
            return Err(ToolError::validation("paths", "at least one path is required"));
        }
        Ok(paths)
    }

    async fn init(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["init"]);
        if let Some(branch) = args.opt_str("initial_branch") {
            cmd.push(format!("--initial-branch={}", branch));
        }
        self.mutate(args, cmd, "initialized repository").await
    }

    async fn clone(&self, args: &Args) -> ToolResult<Payload> {
        let destination = args.str("destination")?;
        let mut cmd = argv(["clone"]);
        if let Some(branch) = args.opt_str("branch") {
            cmd.push("--branch".into());
            cmd.push(branch.to_string());
        }
        cmd.push("--".into());
        cmd.push(args.str("url")?.to_string());
        cmd.push(destination.to_string());
        let output = self.git_in(self.root.clone(), cmd).await?;
        let text = output.combined();
        Ok(json!({"message": format!("cloned into {}", destination), "output": text}))
    }

    async fn add(&self, args: &Args) -> ToolResult<Payload> {
        let paths = Self::paths(args)?;
        let count = paths.len();
        let mut cmd = argv(["add", "--"]);
        cmd.extend(paths);
        self.mutate(args, cmd, &format!("staged {} path(s)", count)).await
    }

    async fn commit(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["commit"]);
        if args.flag("all") {
            cmd.push("--all".into());
        }
        cmd.push("--message".into());
        cmd.push(args.str("message")?.to_string());
        self.mutate(args, cmd, "committed").await
    }

    async fn delete_branch(&self, args: &Args) -> ToolResult<Payload> {
        let name = args.str("name")?;
        let flag = if args.flag("force") { "-D" } else { "-d" };
        let cmd = vec!["branch".into(), flag.into(), name.to_string()];
        self.mutate(args, cmd, &format!("deleted branch {}", name)).await
    }

    async fn merge(&self, args: &Args) -> ToolResult<Payload> {
        let branch = args.str("branch")?;
        let mut cmd = argv(["merge"]);
        if args.flag("no_ff") {
            cmd.push("--no-ff".into());
        }
        cmd.push("--no-edit".into());
        cmd.push(branch.to_string());
        self.mutate(args, cmd, &format!("merged {}", branch)).await
    }

    async fn pull_or_push(&self, args: &Args, verb: &str) -> ToolResult<Payload> {
        let remote = args.str("remote")?;
        let mut cmd = vec![verb.to_string()];
        if verb == "push" && args.flag("set_upstream") {
            cmd.push("--set-upstream".into());
        }
        cmd.push(remote.to_string());
        if let Some(branch) = args.opt_str("branch") {
            cmd.push(branch.to_string());
        }
        self.mutate(args, cmd, &format!("{} {} completed", verb, remote))
            .await
    }

    async fn reset(&self, args: &Args) -> ToolResult<Payload> {
        let mode = args.str("mode")?;
        let target = args.str("target")?;
        let cmd = vec!["reset".into(), format!("--{}", mode), target.to_string()];
        self.mutate(args, cmd, &format!("reset ({}) to {}", mode, target))
            .await
    }

    async fn restore(&self, args: &Args) -> ToolResult<Payload> {
        let paths = Self::paths(args)?;
        let count = paths.len();
        let mut cmd = argv(["restore"]);
        if args.flag("staged") {
            cmd.push("--staged".into());
        }
        cmd.push("--".into());
        cmd.extend(paths);
        self.mutate(args, cmd, &format!("restored {} path(s)", count)).await
    }

    async fn stash(&self, args: &Args) -> ToolResult<Payload> {
        let mut cmd = argv(["stash", "push"]);
        if let Some(message) = args.opt_str("message") {
            cmd.push("--message".into());
            cmd.push(message.to_string());
        }
        self.mutate(args, cmd, "stashed changes").await
    }

    async fn tag_create(&self, args: &Args) -> ToolResult<Payload> {
        let name = args.str("name")?;
        let mut cmd = argv(["tag"]);
        if let Some(message) = args.opt_str("message") {
            cmd.push("--annotate".into());
            cmd.push("--message".into());
            cmd.push(message.to_string());
        }
        cmd.push(name.to_string());
        if let Some(target) = args.opt_str("target") {
            cmd.push(target.to_string());
        }
        self.mutate(args, cmd, &format!("created tag {}", name)).await
    }
}

#[async_trait]
impl ToolSet for GitTools {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn operations(&self) -> &'static [OperationSpec] {
        OPERATIONS
    }

    async fn invoke(&self, operation: &str, args: Args) -> ToolResult<Payload> {
        let args = &args;
        match operation {
            "git_status" => self.status(args).await,
            "git_log" => self.log(args).await,
            "git_diff" => self.diff(args).await,
            "git_show" => {
                self.text(args, vec!["show".into(), args.str("rev")?.to_string()])
                    .await
            }
            "git_blame" => {
                let file = args.str("path")?.to_string();
                self.text(args, vec!["blame".into(), "--".into(), file]).await
            }
            "git_branch_list" => self.branch_list(args).await,
            "git_current_branch" => {
                self.single(args, argv(["rev-parse", "--abbrev-ref", "HEAD"]), "branch")
                    .await
            }
            "git_remote_list" => self.remote_list(args).await,
            "git_tag_list" => self.lines(args, argv(["tag", "--list"]), "tags").await,
            "git_stash_list" => self.lines(args, argv(["stash", "list"]), "entries").await,
            "git_rev_parse" => {
                let rev = args.str("rev")?.to_string();
                self.single(args, vec!["rev-parse".into(), "--verify".into(), rev], "hash")
                    .await
            }
            "git_init" => self.init(args).await,
            "git_clone" => self.clone(args).await,
            "git_add" => self.add(args).await,
            "git_commit" => self.commit(args).await,
            "git_checkout" => {
                let target = args.str("target")?;
                let cmd = vec!["checkout".into(), target.to_string(), "--".into()];
                self.mutate(args, cmd, &format!("checked out {}", target)).await
            }
            "git_create_branch" => {
                let name = args.str("name")?;
                let mut cmd = vec!["branch".into(), name.to_string()];
                if let Some(start) = args.opt_str("start_point") {
                    cmd.push(start.to_string());
                }
                self.mutate(args, cmd, &format!("created branch {}", name)).await
            }
            "git_delete_branch" => self.delete_branch(args).await,
            "git_merge" => self.merge(args).await,
            "git_fetch" => {
                let remote = args.str("remote")?;
                let cmd = vec!["fetch".into(), remote.to_string()];
                self.mutate(args, cmd, &format!("fetched {}", remote)).await
            }
            "git_pull" => self.pull_or_push(args, "pull").await,
            "git_push" => self.pull_or_push(args, "push").await,
            "git_reset" => self.reset(args).await,
            "git_restore" => self.restore(args).await,
            "git_stash" => self.stash(args).await,
            "git_stash_pop" => {
                self.mutate(args, argv(["stash", "pop"]), "applied latest stash")
                    .await
            }
            "git_tag_create" => self.tag_create(args).await,
            other => Err(unknown_operation(FAMILY, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGitRunner;
    use sluice_core::{ErrorKind, FixedSwitch, Outcome, Response};
    use sluice_policy::Gate;
    use sluice_tool::{Dispatcher, InvocationRequest, ToolRegistry};

    struct Fixture {
        dir: tempfile::TempDir,
        runner: Arc<RecordingGitRunner>,
        dispatcher: Dispatcher,
    }

    fn fixture(runner: RecordingGitRunner, dangerous: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(runner);
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(GitTools::new(dir.path(), runner.clone())))
            .unwrap();
        let gate = Gate::new(Arc::new(FixedSwitch::new(dangerous)), dir.path());
        Fixture {
            dir,
            runner,
            dispatcher: Dispatcher::new(Arc::new(registry), gate),
        }
    }

    impl Fixture {
        async fn call(&self, op: &str, args: Value) -> Response {
            self.dispatcher.invoke(InvocationRequest::new(op, args)).await
        }

        fn last_args(&self) -> Vec<String> {
            self.runner.calls().last().map(|c| c.1.clone()).unwrap_or_default()
        }
    }

    #[test]
    fn test_catalog_size() {
        assert_eq!(OPERATIONS.len(), 27);
        assert_eq!(OPERATIONS.iter().filter(|s| s.is_dangerous()).count(), 16);
    }

    #[tokio::test]
    async fn test_every_dangerous_op_blocked_without_switch() {
        let fx = fixture(RecordingGitRunner::new(), false);
        for spec in OPERATIONS.iter().filter(|s| s.is_dangerous()) {
            let resp = fx.call(spec.name, json!({})).await;
            assert_eq!(
                resp.error_kind(),
                Some(ErrorKind::Authorization.as_str()),
                "{}",
                spec.name
            );
        }
        assert_eq!(fx.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_parsing() {
        let runner = RecordingGitRunner::new().with_output(GitOutput::ok(
            "## main...origin/main\n M src/lib.rs\n?? notes.txt\n",
        ));
        let fx = fixture(runner, false);
        let resp = fx.call("git_status", json!({})).await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(resp.payload["branch"], json!("main...origin/main"));
        assert_eq!(resp.payload["clean"], json!(false));
        assert_eq!(
            resp.payload["entries"][1],
            json!({"status": "??", "path": "notes.txt"})
        );
        let (repo, _) = &fx.runner.calls()[0];
        assert_eq!(repo, &fx.dir.path().to_path_buf());
    }

    #[tokio::test]
    async fn test_log_arguments_and_parsing() {
        let runner = RecordingGitRunner::new().with_output(GitOutput::ok(
            "abc\u{1f}Ada\u{1f}2024-01-01T00:00:00+00:00\u{1f}Initial commit\n",
        ));
        let fx = fixture(runner, false);
        let resp = fx
            .call("git_log", json!({"max_count": 9999, "path": "src/lib.rs"}))
            .await;
        assert_eq!(resp.payload["commits"][0]["subject"], json!("Initial commit"));
        let args = fx.last_args();
        assert!(args.contains(&"--max-count=500".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "src/lib.rs"]);
    }

    #[tokio::test]
    async fn test_option_like_ref_rejected() {
        let fx = fixture(RecordingGitRunner::new(), false);
        let resp = fx.call("git_show", json!({"rev": "--output=/tmp/x"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
        assert_eq!(fx.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_repo_directory() {
        let fx = fixture(RecordingGitRunner::new(), false);
        let resp = fx.call("git_status", json!({"repo_path": "nope"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
        assert_eq!(fx.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_not_a_repository() {
        let runner = RecordingGitRunner::new().with_output(GitOutput::failed(
            128,
            "fatal: not a git repository (or any of the parent directories): .git",
        ));
        let fx = fixture(runner, false);
        let resp = fx.call("git_status", json!({})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::NotFound.as_str()));
    }

    #[tokio::test]
    async fn test_merge_conflict() {
        let runner = RecordingGitRunner::new().with_output(GitOutput {
            status: 1,
            stdout: "CONFLICT (content): Merge conflict in a.txt\nAutomatic merge failed".into(),
            stderr: String::new(),
        });
        let fx = fixture(runner, true);
        let resp = fx.call("git_merge", json!({"branch": "feature"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Conflict.as_str()));
        assert_eq!(fx.last_args(), ["merge", "--no-edit", "feature"]);
    }

    #[tokio::test]
    async fn test_add_places_paths_after_separator() {
        let fx = fixture(RecordingGitRunner::new(), true);
        let resp = fx
            .call("git_add", json!({"paths": ["-A", "src/main.rs"]}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(fx.last_args(), ["add", "--", "-A", "src/main.rs"]);

        let resp = fx.call("git_add", json!({"paths": []})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));
    }

    #[tokio::test]
    async fn test_reset_mode_checked() {
        let fx = fixture(RecordingGitRunner::new(), true);
        let resp = fx.call("git_reset", json!({"mode": "nuke"})).await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation.as_str()));

        let resp = fx.call("git_reset", json!({"mode": "HARD"})).await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(fx.last_args(), ["reset", "--hard", "HEAD"]);
    }

    #[tokio::test]
    async fn test_clone_runs_in_root() {
        let fx = fixture(RecordingGitRunner::new(), true);
        std::fs::create_dir(fx.dir.path().join("taken")).unwrap();
        let resp = fx
            .call(
                "git_clone",
                json!({"url": "https://example.com/r.git", "destination": "taken"}),
            )
            .await;
        assert_eq!(resp.error_kind(), Some(ErrorKind::Conflict.as_str()));

        let resp = fx
            .call(
                "git_clone",
                json!({"url": "https://example.com/r.git", "destination": "fresh", "branch": "dev"}),
            )
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(
            fx.last_args(),
            ["clone", "--branch", "dev", "--", "https://example.com/r.git", "fresh"]
        );
    }

    #[tokio::test]
    async fn test_push_with_upstream() {
        let fx = fixture(RecordingGitRunner::new(), true);
        let resp = fx
            .call("git_push", json!({"branch": "main", "set_upstream": true}))
            .await;
        assert_eq!(resp.outcome, Outcome::Ok);
        assert_eq!(fx.last_args(), ["push", "--set-upstream", "origin", "main"]);
    }

    #[tokio::test]
    async fn test_show_truncates() {
        let runner = RecordingGitRunner::new().with_output(GitOutput::ok("0123456789"));
        let fx = fixture(runner, false);
        let resp = fx
            .call("git_show", json!({"rev": "HEAD", "max_chars": 4}))
            .await;
        assert_eq!(resp.payload["content"], json!("0123"));
        assert_eq!(resp.payload["truncated"], json!(true));
    }

    #[tokio::test]
    async fn test_branch_list_marks_current() {
        let runner =
            RecordingGitRunner::new().with_output(GitOutput::ok("*main\n feature/x\n"));
        let fx = fixture(runner, false);
        let resp = fx.call("git_branch_list", json!({})).await;
        assert_eq!(
            resp.payload["branches"],
            json!([
                {"name": "main", "current": true},
                {"name": "feature/x", "current": false}
            ])
        );
    }
}
