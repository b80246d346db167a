//! Persistence provider abstraction.
//!
//! This module defines the [`KeyValueStore`] trait that the frecency store uses to
//! read and write its aggregate. The engine treats the provider as opaque string
//! storage: one blob per resource type, addressed by [`storage_key`].
//!
//! # Design Philosophy
//!
//! The trait is deliberately minimal (`get`/`set` of a string by key). Anything
//! richer, like transactions or compare-and-swap, is outside what the engine
//! relies on, so concurrent writers resolve as last-write-wins.

use crate::domain::error::Result;

/// Prefix prepended to the resource type to form the persistence key.
pub const KEY_PREFIX: &str = "frecency_";

/// Builds the persistence key for a resource type.
///
/// # Examples
///
/// ```
/// use frecent::storage::storage_key;
///
/// assert_eq!(storage_key("products"), "frecency_products");
/// ```
#[must_use]
pub fn storage_key(resource_type: &str) -> String {
    format!("{KEY_PREFIX}{resource_type}")
}

/// Abstraction over key-value persistence backends.
///
/// # Implementations
///
/// - [`crate::storage::MemoryStore`]: shared in-process map (tests, embedding)
/// - [`crate::storage::JsonFileStore`]: one file per key with atomic writes
///
/// # Examples
///
/// ```
/// use frecent::storage::{KeyValueStore, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// store.set("frecency_products", "{}")?;
/// assert_eq!(store.get("frecency_products")?.as_deref(), Some("{}"));
/// # Ok::<(), frecent::FrecencyError>(())
/// ```
pub trait KeyValueStore: Send {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}
