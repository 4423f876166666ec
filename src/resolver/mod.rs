//! Scheme-dispatched reference resolvers.
//!
//! A resolver turns a reference URL into content ([`UrlResolver::resolve`])
//! and, when it is versioning-capable, classifies how a commit-pinned line
//! range drifted between the pinned commit and the current tip
//! ([`UrlResolver::diff`]).
//!
//! Resolvers are registered explicitly at startup in a [`ResolverRegistry`]
//! keyed by URL scheme; there is no load-time discovery. The built-in
//! back-ends are [`file`], [`https`] and the versioning-capable [`git`].
//!
//! # Failure contract
//!
//! Expected failures (network trouble, missing file, unknown commit, auth
//! denied) are downgraded to `Ok(None)`: "no content this time". `Err` is
//! reserved for faults the engine should not paper over - malformed
//! reference URLs, or calling `diff` on a resolver that does not support
//! versioning. Resolvers own their caches across a run; they are never
//! persisted.

pub mod diff;
pub mod file;
pub mod git;
pub mod https;

use crate::core::InspectorError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Content behind a reference URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Content from a back-end with no notion of history.
    Plain {
        /// The raw bytes; `None` when the back-end answered without a body.
        content: Option<Vec<u8>>,
    },
    /// Content from a versioning-capable back-end.
    Versioned {
        /// The raw bytes; `None` when the back-end answered without a body.
        content: Option<Vec<u8>>,
        /// Short (8-char) id of the last commit touching the resource.
        last_commit_id: String,
    },
}

impl Content {
    /// The content bytes, if any.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Self::Plain { content } | Self::Versioned { content, .. } => content.as_deref(),
        }
    }

    /// The last-commit id, for versioned content.
    pub fn last_commit_id(&self) -> Option<&str> {
        match self {
            Self::Plain { .. } => None,
            Self::Versioned { last_commit_id, .. } => Some(last_commit_id),
        }
    }
}

/// Outcome of diffing a pinned line range against the current tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// The queried range is untouched between the two commits.
    NoChange,
    /// The lines are textually identical but sit elsewhere now.
    LinesMoved {
        /// The reference with the new `@commit` and shifted fragment.
        updated_url: String,
        /// The range's content under the new revision, when the diff
        /// carried it (a range past every hunk moves without content).
        current_lines_content: Option<String>,
    },
    /// Content within or overlapping the range differs.
    ContentChanged {
        /// The reference with the new `@commit` and recomputed fragment.
        updated_url: String,
        /// The range's content under the new revision.
        current_lines_content: Option<String>,
        /// The range's content under the pinned revision.
        was_lines_content: Option<String>,
    },
}

/// Uniform contract over URL schemes.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Whether [`diff`](Self::diff) is meaningful for this back-end.
    fn supports_versioning(&self) -> bool {
        false
    }

    /// Fetches the content behind `url`. `Ok(None)` means the reference is
    /// unresolvable this run (logged by the resolver).
    async fn resolve(&self, url: &str) -> Result<Option<Content>>;

    /// Compares the commit pinned in `url` against the current tip.
    /// `Ok(None)` means the comparison itself failed (logged by the
    /// resolver). The default implementation is for back-ends without
    /// versioning and must not be called.
    async fn diff(&self, url: &str) -> Result<Option<DiffOutcome>> {
        anyhow::bail!("resolver does not support versioned diff (url: {url})")
    }
}

/// Registry table mapping URL schemes to resolvers.
///
/// Populated explicitly by the host at startup; unknown schemes are a fatal
/// error for the entity being inspected.
#[derive(Default, Clone)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Arc<dyn UrlResolver>>,
}

impl ResolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `scheme`, replacing any previous entry.
    pub fn register(&mut self, scheme: impl Into<String>, resolver: Arc<dyn UrlResolver>) {
        self.resolvers.insert(scheme.into(), resolver);
    }

    /// Looks up the resolver for `scheme`. `url` is only used to produce a
    /// useful error message.
    pub fn get(&self, scheme: &str, url: &str) -> Result<Arc<dyn UrlResolver>, InspectorError> {
        self.resolvers
            .get(scheme)
            .cloned()
            .ok_or_else(|| InspectorError::UnknownScheme {
                scheme: scheme.to_string(),
                url: url.to_string(),
            })
    }

    /// Registry with the built-in back-ends (`file`, `https`, `git`)
    /// configured from the global config.
    pub fn with_defaults(config: &crate::config::Config) -> Self {
        let mut registry = Self::new();
        registry.register("file", Arc::new(file::FileResolver::new()));
        registry.register(
            "https",
            Arc::new(https::HttpsResolver::new(config.https_headers.clone())),
        );
        registry.register(
            "git",
            Arc::new(git::GitResolver::new(
                config.cache_dir.clone(),
                config.tokens.clone(),
            )),
        );
        registry
    }
}
