//! Infrastructure layer for filesystem and environment interactions.
//!
//! This module resolves where frecency data lives on disk. Everything that
//! reads environment variables is kept here so the engine itself stays pure.

pub mod paths;

pub use paths::{expand_tilde, get_data_dir, DATA_DIR_ENV};
