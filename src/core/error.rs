//! Error handling for the inspector.
//!
//! Two layers, following the usual split between code that matches on
//! failures and code that shows them to a person:
//! - [`InspectorError`] - enumerated error types for every failure mode the
//!   inspector distinguishes
//! - [`ErrorContext`] - wrapper adding a user-friendly message and an
//!   actionable suggestion for CLI display
//!
//! Resolver-layer faults (network, 404, unknown commit) are NOT errors: the
//! resolvers downgrade them to `None` results and the engine treats them as
//! "no content this time". Everything surfacing here is either an
//! environment problem (git missing, config unreadable) or a model problem
//! (malformed entity, unknown scheme) that should stop the current entity.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for inspector operations.
#[derive(Error, Debug)]
pub enum InspectorError {
    /// Git command is not available on the system
    #[error("Git command not found. Please install git and ensure it's in your PATH")]
    GitNotFound,

    /// A git command failed during execution
    #[error("Git command failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g. "clone", "fetch", "push")
        operation: String,
        /// Standard error output from the git command
        stderr: String,
    },

    /// Cloning the model or a referenced repository failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL (credentials redacted)
        url: String,
        /// Why the clone failed
        reason: String,
    },

    /// No resolver is registered for a reference URL's scheme
    #[error("No resolver registered for scheme '{scheme}' (reference: {url})")]
    UnknownScheme {
        /// The scheme that failed to dispatch
        scheme: String,
        /// The offending reference URL
        url: String,
    },

    /// A reference URL could not be parsed
    #[error("Malformed reference URL: {url}")]
    MalformedReference {
        /// The offending URL text
        url: String,
        /// Parser diagnostics
        reason: String,
    },

    /// An entity carries `value-ref` but no `value-regexp`
    #[error("Entity {file} has a value-ref but no pwrt:inspector:value-regexp property")]
    MissingValuePattern {
        /// The entity file being inspected
        file: String,
    },

    /// The `value-regexp` pattern is unusable
    #[error("Invalid value-regexp '{pattern}': {reason}")]
    InvalidValuePattern {
        /// The pattern text from the entity
        pattern: String,
        /// Why it was rejected (syntax error, or no capturing group)
        reason: String,
    },

    /// An entity file is not parseable XML
    #[error("Failed to parse entity file: {file}")]
    EntityParseError {
        /// The entity file path
        file: String,
        /// Parser diagnostics
        reason: String,
    },

    /// Configuration file problems
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for cases not covered by specific variants
    #[error("{message}")]
    Other {
        /// The error description
        message: String,
    },
}

/// User-friendly error wrapper carrying a suggestion and optional details.
///
/// Produced at the CLI boundary by [`user_friendly_error`]; `display` prints
/// the error, details, and suggestion in the conventional colored layout.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Actionable suggestion shown to the user
    pub suggestion: Option<String>,
    /// Extra background shown before the suggestion
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps an error with no suggestion or details.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attaches an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attaches background details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr in the colored CLI layout.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("\n{details}");
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("\n{} {}", "hint:".yellow().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n{details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nHint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Converts an error into an [`ErrorContext`] with a suggestion matched to
/// the failure mode, for display at the CLI boundary.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<InspectorError>() {
        Some(InspectorError::GitNotFound) => {
            Some("Install git from https://git-scm.com/ and re-run".to_string())
        }
        Some(InspectorError::GitCloneFailed { .. }) => Some(
            "Check the repository URL and your network connection. For private \
             repositories, configure an access token in the global config"
                .to_string(),
        ),
        Some(InspectorError::GitCommandError { stderr, .. }) => {
            if stderr.contains("Authentication") || stderr.contains("could not read Username") {
                Some(
                    "Authentication failed. Configure an access token for this host in \
                     ~/.archi-inspector/config.toml"
                        .to_string(),
                )
            } else {
                None
            }
        }
        Some(InspectorError::UnknownScheme { scheme, .. }) => Some(format!(
            "Built-in schemes are 'file', 'https' and 'git'; '{scheme}' is not one of \
             them. Check the reference URL in the entity"
        )),
        Some(InspectorError::MissingValuePattern { .. }) => Some(
            "Add a pwrt:inspector:value-regexp property with exactly one capturing group"
                .to_string(),
        ),
        Some(InspectorError::InvalidValuePattern { .. }) => Some(
            "The pattern must be a valid regular expression with at least one capturing \
             group, e.g. version: ([0-9.]+)"
                .to_string(),
        ),
        Some(InspectorError::ConfigError { .. }) => {
            Some("Check ~/.archi-inspector/config.toml for syntax errors".to_string())
        }
        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    ctx
}
