//! Type-safe git command builder.
//!
//! Fluent construction and execution of system `git` invocations over
//! `tokio::process`, with consistent timeout handling, error context, and
//! output capture. Using the system git (rather than a libgit2 binding)
//! keeps authentication, credential helpers, and host quirks working the
//! way the user's git works.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::InspectorError;

/// Builder for a single git invocation.
///
/// Defaults: output captured, five-minute timeout, current process working
/// directory. The working directory is passed with `-C` so execution is
/// independent of the process cwd.
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<std::path::PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    /// For clone commands, the redacted URL for error messages.
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(Duration::from_secs(300)),
            clone_url: None,
        }
    }
}

/// Captured output of a git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl GitCommandOutput {
    /// Stdout as trimmed text.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

impl GitCommand {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the repository directory the command runs against.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Overrides the timeout (`None` disables it).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Executes the command, failing on a non-zero exit status.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let git = ensure_git()?;
        let mut cmd = Command::new(git);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());
        cmd.args(&full_args);

        tracing::debug!(target: "git", "Executing: git {}", full_args.join(" "));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => {
                    result.context(format!("Failed to execute git {}", full_args.join(" ")))?
                }
                Err(_) => {
                    return Err(InspectorError::GitCommandError {
                        operation: self.operation_name(&full_args),
                        stderr: format!(
                            "Git command timed out after {} seconds. This may indicate \
                             network trouble or an authentication prompt waiting for input",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .context(format!("Failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(target: "git", "Command failed ({:?}): {}", output.status.code(), stderr.trim());

            let operation = self.operation_name(&full_args);
            let error = if operation == "clone" {
                InspectorError::GitCloneFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                }
            } else {
                InspectorError::GitCommandError {
                    operation,
                    stderr,
                }
            };
            return Err(error.into());
        }

        Ok(GitCommandOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Executes and returns trimmed stdout text.
    pub async fn execute_stdout(self) -> Result<String> {
        Ok(self.execute().await?.stdout_text())
    }

    /// Executes and captures output without treating a non-zero exit status
    /// as failure. For commands like `diff --no-index` whose exit code
    /// encodes a comparison result.
    pub async fn execute_lenient(self) -> Result<GitCommandOutput> {
        let git = ensure_git()?;
        let mut cmd = Command::new(git);
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());
        cmd.args(&full_args);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        let output = cmd
            .output()
            .await
            .context(format!("Failed to execute git {}", full_args.join(" ")))?;
        Ok(GitCommandOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Executes, discarding output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    fn operation_name(&self, full_args: &[String]) -> String {
        let start = if full_args.first().map(String::as_str) == Some("-C") && full_args.len() > 2 {
            2
        } else {
            0
        };
        full_args
            .get(start)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

// Constructors for the operations the inspector performs.
impl GitCommand {
    /// `git clone <url> <target>`. `display_url` is the redacted form used
    /// in error messages; credentials never reach the error path.
    pub fn clone_repo(url: &str, display_url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().args([
            "clone",
            url,
            target.as_ref().display().to_string().as_str(),
        ]);
        cmd.clone_url = Some(display_url.to_string());
        cmd
    }

    /// `git fetch --all --tags --force`.
    pub fn fetch() -> Self {
        Self::new().args(["fetch", "--all", "--tags", "--force"])
    }

    /// `git pull`.
    pub fn pull() -> Self {
        Self::new().args(["pull"])
    }

    /// `git rev-parse <ref>`.
    pub fn rev_parse(ref_name: &str) -> Self {
        Self::new().args(["rev-parse", ref_name])
    }

    /// `git show <rev>:<path>`.
    pub fn show(rev: &str, path: &str) -> Self {
        Self::new().args(["show", format!("{rev}:{path}").as_str()])
    }

    /// `git diff -M --no-color <from> <to>`, the whole-repository diff the
    /// compare cache is built from.
    pub fn diff(from: &str, to: &str) -> Self {
        Self::new().args(["diff", "-M", "--no-color", from, to])
    }

    /// `git rev-list --max-count=1 <rev> -- <path>`.
    pub fn last_commit_for_path(rev: &str, path: &str) -> Self {
        Self::new().args(["rev-list", "--max-count=1", rev, "--", path])
    }

    /// `git status --porcelain`.
    pub fn status_porcelain() -> Self {
        Self::new().args(["status", "--porcelain"])
    }

    /// `git add -u <pathspec>` - stage modified tracked files.
    pub fn add_updated(pathspec: &str) -> Self {
        Self::new().args(["add", "-u", pathspec])
    }

    /// `git commit -m <message>` with an explicit author identity.
    pub fn commit(message: &str, author_name: &str, author_email: &str) -> Self {
        Self::new()
            .args(["commit", "-m", message])
            .args([format!("--author={author_name} <{author_email}>")])
            .env("GIT_COMMITTER_NAME", author_name)
            .env("GIT_COMMITTER_EMAIL", author_email)
    }

    /// `git push`.
    pub fn push() -> Self {
        Self::new().args(["push"])
    }
}

/// Locates the git executable, once per process.
pub fn ensure_git() -> Result<&'static str, InspectorError> {
    use std::sync::OnceLock;
    static GIT_AVAILABLE: OnceLock<bool> = OnceLock::new();
    let available = *GIT_AVAILABLE.get_or_init(|| which::which("git").is_ok());
    if available {
        Ok("git")
    } else {
        Err(InspectorError::GitNotFound)
    }
}
