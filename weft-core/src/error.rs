//! Error types for the binding runtime.
//!
//! The core has a small failure surface: almost everything is
//! infallible, not-found lookups return absence values, and the two genuine
//! misuse cases below are reported as errors and propagate unchanged to the
//! immediate caller. There is no retry or recovery layer here.

use thiserror::Error;

/// Errors raised by the reactive core.
#[derive(Debug, Error)]
pub enum Error {
    /// A computed property was constructed with a getter only and something
    /// tried to write to it.
    #[error("computed property `{0}` is read-only (no setter was provided)")]
    ReadOnlyComputed(String),

    /// A record was constructed from a value that is not a map.
    #[error("expected a map at the top level, found {0}")]
    NotAMap(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
