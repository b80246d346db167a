//! Domain layer: shared error types.
//!
//! The frecency aggregate itself lives in [`crate::storage::models`] because it
//! *is* the persisted format; this layer only carries what every other layer
//! needs to report failures.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases

pub mod error;

pub use error::{FrecencyError, Result};
