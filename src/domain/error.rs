//! Error types for the frecency engine.
//!
//! This module defines the centralized error type [`FrecencyError`] and a type alias
//! [`Result`] used throughout the crate. All errors are implemented using the
//! `thiserror` crate for automatic `Error` trait implementation.

use thiserror::Error;

/// The main error type for frecency store and ranking operations.
///
/// Scoring never fails: only construction and `record` touch the persistence
/// provider, so every variant here originates from configuration or storage.
///
/// # Examples
///
/// ```
/// use frecent::FrecencyError;
///
/// fn validate(resource_type: &str) -> Result<(), FrecencyError> {
///     if resource_type.is_empty() {
///         return Err(FrecencyError::Config("resource type is required".to_string()));
///     }
///     Ok(())
/// }
///
/// assert!(validate("").is_err());
/// ```
#[derive(Debug, Error)]
pub enum FrecencyError {
    /// Configuration is invalid or missing.
    ///
    /// Raised at construction time, e.g. when no resource type is given, or when
    /// a configuration file cannot be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persistence provider failed to read or write a value.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted blob exists but does not decode into frecency data.
    #[error("Corrupt frecency data under key {key:?}: {source}")]
    Corrupt {
        /// Persistence key holding the malformed blob.
        key: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory aggregate could not be encoded for persistence.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A specialized `Result` type for frecency operations.
pub type Result<T> = std::result::Result<T, FrecencyError>;
