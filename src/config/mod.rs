//! Global configuration.
//!
//! User-wide settings live in `~/.archi-inspector/config.toml` (override the
//! path with `ARCHI_INSPECTOR_CONFIG`). The file holds everything that must
//! not be committed alongside a model: access tokens for referenced git
//! hosts, HTTPS request headers, the clone cache location, and the identity
//! used for annotation commits.
//!
//! ```toml
//! # ~/.archi-inspector/config.toml
//! cache_dir = "/var/cache/archi-inspector"
//! commit_author = "Archi Inspector"
//! commit_email = "inspector@example.com"
//!
//! [tokens]
//! "gitlab.example.com" = "glpat-xxxxxxxxxxxx"
//!
//! [https_headers]
//! Authorization = "Bearer xyz"
//! ```
//!
//! Every field is optional; a missing file yields the defaults.

use crate::core::InspectorError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default author identity for annotation commits.
const DEFAULT_COMMIT_AUTHOR: &str = "Archi Power Tools Inspector";
const DEFAULT_COMMIT_EMAIL: &str = "inspector@archi-powertools.invalid";

/// Runtime configuration, after defaults and environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the `git` resolver clones referenced repositories into.
    pub cache_dir: PathBuf,
    /// Per-host access tokens for referenced git repositories.
    pub tokens: HashMap<String, String>,
    /// Request headers sent by the `https` resolver.
    pub https_headers: HashMap<String, String>,
    /// Author name for annotation commits.
    pub commit_author: String,
    /// Author email for annotation commits.
    pub commit_email: String,
}

/// On-disk shape of the config file; everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    tokens: HashMap<String, String>,
    #[serde(default)]
    https_headers: HashMap<String, String>,
    commit_author: Option<String>,
    commit_email: Option<String>,
}

impl Config {
    /// Loads the config file when present, otherwise the defaults.
    /// Environment overrides (`ARCHI_INSPECTOR_CONFIG`,
    /// `ARCHI_INSPECTOR_CACHE_DIR`) are applied in both cases.
    pub fn load_or_default() -> Result<Self, InspectorError> {
        let path = Self::config_path();
        let file = if path.exists() {
            Self::parse_file(&path)?
        } else {
            ConfigFile::default()
        };
        Ok(Self::from_file(file))
    }

    /// Loads from an explicit path; missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, InspectorError> {
        Ok(Self::from_file(Self::parse_file(path)?))
    }

    /// The config file location: `ARCHI_INSPECTOR_CONFIG` when set, else
    /// `~/.archi-inspector/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ARCHI_INSPECTOR_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".archi-inspector")
            .join("config.toml")
    }

    fn parse_file(path: &Path) -> Result<ConfigFile, InspectorError> {
        let text = std::fs::read_to_string(path).map_err(|e| InspectorError::ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        toml::from_str(&text).map_err(|e| InspectorError::ConfigError {
            message: format!("cannot parse {}: {e}", path.display()),
        })
    }

    fn from_file(file: ConfigFile) -> Self {
        let cache_dir = std::env::var("ARCHI_INSPECTOR_CACHE_DIR")
            .map(PathBuf::from)
            .ok()
            .or(file.cache_dir)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".archi-inspector")
                    .join("cache")
            });
        Self {
            cache_dir,
            tokens: file.tokens,
            https_headers: file.https_headers,
            commit_author: file
                .commit_author
                .unwrap_or_else(|| DEFAULT_COMMIT_AUTHOR.to_string()),
            commit_email: file
                .commit_email
                .unwrap_or_else(|| DEFAULT_COMMIT_EMAIL.to_string()),
        }
    }
}
