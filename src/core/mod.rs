//! Core types shared across the inspector.
//!
//! Home of [`InspectorError`], the strongly-typed error enum, and the
//! [`ErrorContext`] presentation wrapper used at the CLI boundary.

pub mod error;

pub use error::{ErrorContext, InspectorError};
