//! Shared test support: a scripted resolver and entity-file helpers.

use anyhow::Result;
use archi_inspector::resolver::{Content, DiffOutcome, UrlResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A resolver answering from fixed per-URL scripts, recording every call.
/// Unscripted URLs resolve to nothing, mirroring an unresolvable reference.
#[derive(Default)]
pub struct MockResolver {
    pub versioning: bool,
    pub resolve_results: HashMap<String, Option<Content>>,
    pub diff_results: HashMap<String, Option<DiffOutcome>>,
    pub resolve_calls: Mutex<Vec<String>>,
    pub diff_calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn plain(url: &str, content: &[u8]) -> Self {
        let mut resolver = Self::default();
        resolver.resolve_results.insert(
            url.to_string(),
            Some(Content::Plain {
                content: Some(content.to_vec()),
            }),
        );
        resolver
    }

    pub fn versioning() -> Self {
        Self {
            versioning: true,
            ..Self::default()
        }
    }

    pub fn with_diff(mut self, url: &str, outcome: Option<DiffOutcome>) -> Self {
        self.diff_results.insert(url.to_string(), outcome);
        self
    }

    pub fn with_content(mut self, url: &str, content: Option<Content>) -> Self {
        self.resolve_results.insert(url.to_string(), content);
        self
    }
}

#[async_trait]
impl UrlResolver for MockResolver {
    fn supports_versioning(&self) -> bool {
        self.versioning
    }

    async fn resolve(&self, url: &str) -> Result<Option<Content>> {
        self.resolve_calls.lock().unwrap().push(url.to_string());
        Ok(self.resolve_results.get(url).cloned().flatten())
    }

    async fn diff(&self, url: &str) -> Result<Option<DiffOutcome>> {
        self.diff_calls.lock().unwrap().push(url.to_string());
        Ok(self
            .diff_results
            .get(url)
            .cloned()
            .unwrap_or_else(|| panic!("diff not scripted for {url}")))
    }
}

/// Writes `content` as an entity file under `dir` and returns its path.
pub fn write_entity(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
