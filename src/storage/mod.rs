//! Storage layer: the persisted frecency aggregate and its providers.
//!
//! This module owns everything that ends up in the persisted blob, plus the
//! key-value providers the blob is written to.
//!
//! # Modules
//!
//! - `backend`: [`KeyValueStore`] provider trait and key format
//! - `memory`: shared in-memory provider
//! - `json`: directory-of-JSON-files provider with atomic writes
//! - `models`: the [`FrecencyData`] aggregate and its update/eviction rules
//! - `buckets`: map of non-empty sequences backing the by-query index
//! - `recency`: O(1) move-to-front / evict-from-back recency list

pub mod backend;
pub mod buckets;
pub mod json;
pub mod memory;
pub mod models;
pub mod recency;

pub use backend::{storage_key, KeyValueStore, KEY_PREFIX};
pub use buckets::BucketMap;
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use models::{
    FrecencyData, IdSelection, Limits, QuerySelection, DEFAULT_RECENT_SELECTIONS_LIMIT,
    DEFAULT_TIMESTAMPS_LIMIT,
};
pub use recency::{RecencyList, Touch};
