//! JSON file-based persistence provider.
//!
//! This module provides a directory-backed [`KeyValueStore`]: each key maps to one
//! `<key>.json` file. Writes are atomic: every write goes to its own temporary
//! file in the same directory, which is then renamed over the target, so neither
//! a crash nor a concurrent writer can leave a half-written blob behind.
//!
//! # Performance Characteristics
//!
//! - **Read**: one file read per `get`; the engine caches the decoded aggregate
//! - **Write**: O(n) in the blob size, which the eviction policy keeps bounded
//! - **Best for**: single-user, local history

use crate::domain::error::Result;
use crate::storage::backend::KeyValueStore;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory-backed key-value store.
///
/// # Thread Safety
///
/// This type is `Send` but holds no lock. Two processes writing the same key
/// race, and the last rename wins with a complete blob.
///
/// # File Layout
///
/// ```text
/// <dir>/
///   frecency_products.json
///   frecency_users.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Directory holding one file per key.
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) a file store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use frecent::storage::JsonFileStore;
    ///
    /// let store = JsonFileStore::new("/tmp/frecent")?;
    /// # Ok::<(), frecent::FrecencyError>(())
    /// ```
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tracing::debug!(path = ?dir, "initializing JSON file store");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// Bytes outside `[A-Za-z0-9._-]` are hex-escaped so that any resource type
    /// maps to exactly one file name.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
                name.push(char::from(byte));
            } else {
                let _ = write!(name, "%{byte:02X}");
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let _span = tracing::debug_span!("json_store_get", path = ?path).entered();

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::debug!(bytes = contents.len(), "loaded blob");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no blob stored yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let _span = tracing::debug_span!("json_store_set", path = ?path).entered();

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tracing::trace!(tmp_path = ?tmp.path(), "writing to temporary file");
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;

        tracing::trace!("renaming temporary file to final location");
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(bytes = value.len(), "blob saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_unsafe_key_bytes() {
        let store = JsonFileStore {
            dir: PathBuf::from("/data"),
        };
        assert_eq!(
            store.path_for("frecency_a/b c"),
            PathBuf::from("/data/frecency_a%2Fb%20c.json")
        );
        assert_eq!(
            store.path_for("frecency_users"),
            PathBuf::from("/data/frecency_users.json")
        );
    }

    #[test]
    fn concurrent_writers_never_tear_a_blob() {
        let dir = tempfile::tempdir().unwrap();
        let key = "frecency_products";
        let short = "[1]".to_string();
        let long = format!("[{}]", vec!["12345"; 2000].join(","));

        std::thread::scope(|scope| {
            for value in [&short, &long] {
                let mut store = JsonFileStore::new(dir.path()).unwrap();
                scope.spawn(move || {
                    for _ in 0..50 {
                        store.set(key, value).unwrap();
                    }
                });
            }
        });

        let store = JsonFileStore::new(dir.path()).unwrap();
        let blob = store.get(key).unwrap().unwrap();
        assert!(blob == short || blob == long);
        assert!(serde_json::from_str::<serde_json::Value>(&blob).is_ok());

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frecency_products.json".to_string()]);
    }
}
