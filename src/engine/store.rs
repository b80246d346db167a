//! Frecency store: the persisted aggregate plus its in-memory cache.
//!
//! [`FrecencyStore`] owns one resource type's [`FrecencyData`]. It loads the
//! aggregate once at construction, and on every selection it re-reads the
//! provider, applies the selection, writes the result back and replaces its
//! cache. Reads for scoring go to the cache only.
//!
//! # Consistency
//!
//! Re-reading before each write narrows the window in which another writer's
//! update (another process, another engine over a shared provider) is lost, but
//! does not close it: two interleaved `record` calls on the same key resolve as
//! last-write-wins.

use crate::domain::error::{FrecencyError, Result};
use crate::storage::{storage_key, FrecencyData, KeyValueStore, Limits};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What to do when the persisted blob cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Log a warning and start over from empty data.
    #[default]
    Reset,
    /// Return [`FrecencyError::Corrupt`] to the caller.
    Fail,
}

impl FromStr for CorruptPolicy {
    type Err = FrecencyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" => Ok(Self::Reset),
            "fail" => Ok(Self::Fail),
            other => Err(FrecencyError::Config(format!(
                "unknown corrupt-data policy {other:?} (expected \"reset\" or \"fail\")"
            ))),
        }
    }
}

/// Construction options for a [`FrecencyStore`].
///
/// Limits left unset (or set to zero) fall back to the defaults of 10
/// timestamps and 100 ids.
///
/// # Examples
///
/// ```
/// use frecent::engine::FrecencyOptions;
///
/// let options = FrecencyOptions::new("products")
///     .timestamps_limit(5)
///     .recent_selections_limit(50);
/// assert_eq!(options.limits().timestamps, 5);
/// assert_eq!(options.limits().recent_selections, 50);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrecencyOptions {
    /// Resource type; names the persistence key. Required.
    pub resource_type: String,
    /// Max timestamps retained per selection entry.
    pub timestamps_limit: Option<usize>,
    /// Max distinct ids tracked.
    pub recent_selections_limit: Option<usize>,
    /// Handling of an undecodable persisted blob.
    pub on_corrupt: CorruptPolicy,
}

impl FrecencyOptions {
    /// Options for `resource_type` with default limits.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Sets the per-entry timestamp cap.
    #[must_use]
    pub fn timestamps_limit(mut self, limit: usize) -> Self {
        self.timestamps_limit = Some(limit);
        self
    }

    /// Sets the cap on distinct tracked ids.
    #[must_use]
    pub fn recent_selections_limit(mut self, limit: usize) -> Self {
        self.recent_selections_limit = Some(limit);
        self
    }

    /// Sets the corrupt-blob policy.
    #[must_use]
    pub fn on_corrupt(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    /// Effective limits, with defaults substituted for unset or zero values.
    #[must_use]
    pub fn limits(&self) -> Limits {
        let defaults = Limits::default();
        Limits {
            timestamps: self
                .timestamps_limit
                .filter(|&n| n > 0)
                .unwrap_or(defaults.timestamps),
            recent_selections: self
                .recent_selections_limit
                .filter(|&n| n > 0)
                .unwrap_or(defaults.recent_selections),
        }
    }
}

/// Persisted frecency aggregate for one resource type.
#[derive(Debug)]
pub struct FrecencyStore<S: KeyValueStore> {
    resource_type: String,
    key: String,
    limits: Limits,
    on_corrupt: CorruptPolicy,
    provider: S,
    cache: FrecencyData,
}

impl<S: KeyValueStore> FrecencyStore<S> {
    /// Opens the store for `options.resource_type` and loads its data.
    ///
    /// # Errors
    ///
    /// - [`FrecencyError::Config`] if the resource type is empty
    /// - any error from the provider's `get`
    /// - [`FrecencyError::Corrupt`] if the blob is malformed and the policy is
    ///   [`CorruptPolicy::Fail`]
    pub fn open(options: FrecencyOptions, provider: S) -> Result<Self> {
        let resource_type = options.resource_type.trim().to_string();
        if resource_type.is_empty() {
            return Err(FrecencyError::Config("resource type is required".to_string()));
        }

        let limits = options.limits();
        let key = storage_key(&resource_type);
        tracing::debug!(
            key = %key,
            timestamps_limit = limits.timestamps,
            recent_selections_limit = limits.recent_selections,
            "opening frecency store"
        );

        let mut store = Self {
            resource_type,
            key,
            limits,
            on_corrupt: options.on_corrupt,
            provider,
            cache: FrecencyData::default(),
        };
        store.cache = store.load()?;

        tracing::debug!(
            tracked_ids = store.cache.recent_selections.len(),
            queries = store.cache.queries.len(),
            "frecency store loaded"
        );
        Ok(store)
    }

    /// Resource type this store was opened for.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Persistence key, `frecency_<resource type>`.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Effective size limits.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Underlying persistence provider.
    #[must_use]
    pub const fn provider(&self) -> &S {
        &self.provider
    }

    /// The cached aggregate as of the last load or successful record.
    #[must_use]
    pub const fn snapshot(&self) -> &FrecencyData {
        &self.cache
    }

    /// Replaces the cache with a fresh read from the provider.
    ///
    /// # Errors
    ///
    /// Same as [`FrecencyStore::open`]; the cache is left untouched on error.
    pub fn reload(&mut self) -> Result<()> {
        self.cache = self.load()?;
        Ok(())
    }

    /// Records that `selected_id` was chosen for `search_query` now.
    ///
    /// # Errors
    ///
    /// See [`FrecencyStore::record_at`].
    pub fn record(&mut self, search_query: &str, selected_id: &str) -> Result<()> {
        self.record_at(search_query, selected_id, crate::engine::now_millis())
    }

    /// Records that `selected_id` was chosen for `search_query` at `now`
    /// (Unix milliseconds).
    ///
    /// Empty queries or ids are ignored. Otherwise the aggregate is re-read
    /// from the provider, updated, written back, and cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider read or write fails, or if the stored
    /// blob is corrupt under [`CorruptPolicy::Fail`]. The cache is only replaced
    /// after a successful write.
    pub fn record_at(&mut self, search_query: &str, selected_id: &str, now: i64) -> Result<()> {
        if search_query.is_empty() || selected_id.is_empty() {
            tracing::trace!("ignoring selection with empty query or id");
            return Ok(());
        }

        let _span = tracing::debug_span!("record_selection",
            key = %self.key,
            query = %search_query,
            id = %selected_id
        )
        .entered();

        let mut data = self.load()?;
        let evicted = data.register_selection(search_query, selected_id, now, self.limits);
        if let Some(evicted) = &evicted {
            tracing::debug!(evicted = %evicted, "evicted least recently selected id");
        }

        self.save(&data)?;
        self.cache = data;

        tracing::debug!(
            tracked_ids = self.cache.recent_selections.len(),
            queries = self.cache.queries.len(),
            "selection recorded"
        );
        Ok(())
    }

    fn load(&self) -> Result<FrecencyData> {
        let Some(blob) = self.provider.get(&self.key)? else {
            tracing::debug!(key = %self.key, "no stored frecency data, starting empty");
            return Ok(FrecencyData::default());
        };
        if blob.trim().is_empty() {
            return Ok(FrecencyData::default());
        }

        match serde_json::from_str::<FrecencyData>(&blob) {
            Ok(mut data) => {
                let dropped = data.enforce_limits(self.limits);
                if dropped > 0 {
                    tracing::debug!(dropped = dropped, "trimmed stored data to current limits");
                }
                Ok(data)
            }
            Err(source) => match self.on_corrupt {
                CorruptPolicy::Reset => {
                    tracing::warn!(key = %self.key, error = %source, "discarding corrupt frecency data");
                    Ok(FrecencyData::default())
                }
                CorruptPolicy::Fail => Err(FrecencyError::Corrupt {
                    key: self.key.clone(),
                    source,
                }),
            },
        }
    }

    fn save(&mut self, data: &FrecencyData) -> Result<()> {
        let json = serde_json::to_string(data).map_err(FrecencyError::Serialize)?;
        tracing::trace!(key = %self.key, bytes = json.len(), "persisting frecency data");
        self.provider.set(&self.key, &json)
    }
}
