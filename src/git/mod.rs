//! Git operations for the inspector.
//!
//! An async wrapper around the system `git` command, used in two places:
//! the orchestrator clones/pulls the model repository and commits annotated
//! files back, and the `git` resolver back-end reads referenced
//! repositories (content at a ref, diffs between commits, last-commit ids).
//!
//! Credentials ride in remote URLs built from config tokens; every error
//! and log path receives the redacted form only.

pub mod command_builder;

use crate::git::command_builder::GitCommand;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Handle to a local git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Wraps an existing local repository.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The repository's working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` looks like a git working copy.
    pub fn is_repo(path: &Path) -> bool {
        path.join(".git").exists()
    }

    /// Clones `url` into `target`. `display_url` (credentials redacted) is
    /// what failure messages may show.
    pub async fn clone(url: &str, display_url: &str, target: impl AsRef<Path>) -> Result<Self> {
        let target_path = target.as_ref();
        if let Some(parent) = target_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        GitCommand::clone_repo(url, display_url, target_path)
            .execute_success()
            .await?;
        Ok(Self::new(target_path))
    }

    /// Fetches all remotes and tags.
    pub async fn fetch(&self) -> Result<()> {
        GitCommand::fetch()
            .current_dir(&self.path)
            .execute_success()
            .await
    }

    /// Pulls the current branch.
    pub async fn pull(&self) -> Result<()> {
        GitCommand::pull()
            .current_dir(&self.path)
            .execute_success()
            .await
    }

    /// Resolves a ref to its full commit sha. Tries the remote-tracking
    /// form first so branch names resolve to the fetched tip, then the ref
    /// as written (tags, local branches, commit ids).
    pub async fn resolve_commit(&self, ref_name: &str) -> Result<String> {
        if let Ok(sha) = GitCommand::rev_parse(&format!("origin/{ref_name}"))
            .current_dir(&self.path)
            .execute_stdout()
            .await
        {
            return Ok(sha);
        }
        GitCommand::rev_parse(&format!("{ref_name}^{{commit}}"))
            .current_dir(&self.path)
            .execute_stdout()
            .await
    }

    /// The file's raw content at a revision.
    pub async fn file_at_rev(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        let output = GitCommand::show(rev, path)
            .current_dir(&self.path)
            .execute()
            .await?;
        Ok(output.stdout)
    }

    /// The whole-repository unified diff between two revisions, with rename
    /// detection.
    pub async fn diff_text(&self, from: &str, to: &str) -> Result<String> {
        let output = GitCommand::diff(from, to)
            .current_dir(&self.path)
            .execute()
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Full sha of the last commit touching `path` as of `rev`, or `None`
    /// for an untracked path.
    pub async fn last_commit_for_path(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let sha = GitCommand::last_commit_for_path(rev, path)
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(if sha.is_empty() { None } else { Some(sha) })
    }

    /// Whether the working tree has modifications.
    pub async fn is_dirty(&self) -> Result<bool> {
        let status = GitCommand::status_porcelain()
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(!status.is_empty())
    }

    /// Stages modified tracked files under `pathspec` and commits with the
    /// given identity.
    pub async fn commit_updated(
        &self,
        pathspec: &str,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<()> {
        GitCommand::add_updated(pathspec)
            .current_dir(&self.path)
            .execute_success()
            .await?;
        GitCommand::commit(message, author_name, author_email)
            .current_dir(&self.path)
            .execute_success()
            .await
    }

    /// Pushes the current branch to its upstream.
    pub async fn push(&self) -> Result<()> {
        GitCommand::push()
            .current_dir(&self.path)
            .execute_success()
            .await
    }
}
