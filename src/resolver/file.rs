//! `file://` resolver - local filesystem reads.
//!
//! Resolves `file:///abs/path#Ln[-m]` to the selected lines of a local
//! file (line endings preserved), or the whole file when no line locator
//! is present. Not versioning-capable; a missing or unreadable file logs a
//! warning and resolves to nothing.

use super::{Content, UrlResolver};
use crate::reference::Reference;
use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Resolver for the `file` scheme.
#[derive(Debug, Default)]
pub struct FileResolver;

impl FileResolver {
    /// Creates the resolver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UrlResolver for FileResolver {
    async fn resolve(&self, url: &str) -> Result<Option<Content>> {
        let reference = Reference::parse(url)?;
        let bytes = match tokio::fs::read(reference.path()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{}: {}", e.kind(), reference.path());
                return Ok(None);
            }
        };

        let content = match reference.line_range() {
            Some((first, last)) => select_lines(&bytes, first, last),
            None => bytes,
        };
        Ok(Some(Content::Plain {
            content: Some(content),
        }))
    }
}

/// Returns lines `first..=last` (1-based) with their line endings kept.
fn select_lines(bytes: &[u8], first: u64, last: u64) -> Vec<u8> {
    bytes
        .split_inclusive(|&b| b == b'\n')
        .skip(first.saturating_sub(1) as usize)
        .take((last.saturating_sub(first) + 1) as usize)
        .flatten()
        .copied()
        .collect()
}
