//! Archi Inspector - drift detection for Archi models kept in git.
//!
//! An Archi model in coArchi format is a tree of XML entity files. Entities
//! may point at facts that live outside the model - a line range in a file in
//! another git repository, a document behind HTTPS, a file on disk - through
//! `pwrt:inspector:*` properties. This crate re-resolves those references,
//! detects when the upstream fact has drifted from the recorded state,
//! annotates the entity in place, and (in the `run` command) commits the
//! annotated files back to the model repository.
//!
//! # Architecture
//!
//! - [`inspect`] - the per-entity inspection engine: reads pinned references,
//!   classifies drift, advances commit pins, extracts values, writes the
//!   canonical form back
//! - [`resolver`] - the scheme-dispatched resolver registry, the resolver
//!   back-ends (`file`, `https`, `git`), and the unified-diff interpreter
//!   behind the versioning-capable back-end
//! - [`model`] - the entity XML accessor and the fixed-form Archi writer
//! - [`reference`] - reference URL parsing and commit-pin rewriting
//! - [`git`] - async wrapper around the system `git` command
//! - [`config`] - global configuration (cache dir, tokens, HTTPS headers)
//! - [`cli`] - the `run` and `file` commands
//! - [`core`] - error types and user-facing error presentation
//!
//! # Reference URLs
//!
//! ```text
//! scheme://authority/path[@hexsha][#Ln[-m]]
//! ```
//!
//! A `@hexsha` suffix on the path pins the reference to a commit; when the
//! resolver for the scheme is versioning-capable, pinned references are
//! inspected by diffing the pinned commit against the current tip instead of
//! re-hashing content.

pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod inspect;
pub mod model;
pub mod reference;
pub mod resolver;
pub mod utils;
