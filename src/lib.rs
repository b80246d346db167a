//! Frecent: client-side frecency ranking for search results.
//!
//! Frecent remembers which result a user picked for which query and uses that
//! history to reorder future result lists:
//! - Records query → selection events with bounded, self-evicting history
//! - Scores candidates with time-decayed frequency (frequency + recency)
//! - Falls back from exact query to typed-ahead prefix to id-only matches
//! - Leaves candidates without history in their upstream order
//! - Persists through a pluggable key-value provider (JSON files or in-memory)

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI (main.rs)                                      │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Engine (engine/)                                   │
//! │  - Frecency facade (record / rank)                  │
//! │  - FrecencyStore (load, update, evict, persist)     │
//! │  - Scorer (decay buckets, tiered query matching)    │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Storage (storage/)                                 │
//! │  - FrecencyData aggregate + invariants              │
//! │  - BucketMap / RecencyList index structures         │
//! │  - KeyValueStore providers (JSON files, memory)     │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Infrastructure & Domain                            │
//! │  - Data directory resolution (infrastructure/)      │
//! │  - Error types (domain/error)                       │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - stderr logging, file-based OTLP span export      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`engine`]: recording, scoring and ranking
//! - [`storage`]: persisted aggregate and key-value providers
//! - [`domain`]: error types
//! - [`infrastructure`]: filesystem locations
//! - [`observability`]: tracing subscriber setup
//!
//! # Configuration
//!
//! ```toml
//! # frecent.toml
//! resource_type = "products"
//! timestamps_limit = 10
//! recent_selections_limit = 100
//! on_corrupt = "reset"
//! data_dir = "~/.local/share/frecent"
//! trace_level = "info"
//! trace_file = "/tmp/frecent-otlp.json"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use frecent::engine::{Frecency, FrecencyOptions};
//! use frecent::storage::MemoryStore;
//!
//! let mut frecency = Frecency::new(FrecencyOptions::new("products"), MemoryStore::new())?;
//!
//! // The user typed "shoes" and picked p2.
//! frecency.record("shoes", "p2")?;
//!
//! // Next time, p2 jumps ahead of the server's order, even for "sho".
//! let ranked = frecency.rank("sho", vec!["p1", "p2", "p3"], |id| Some(*id));
//! let order: Vec<&str> = ranked.iter().map(|s| s.item).collect();
//! assert_eq!(order, vec!["p2", "p1", "p3"]);
//! # Ok::<(), frecent::FrecencyError>(())
//! ```

pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod observability;
pub mod storage;

pub use domain::{FrecencyError, Result};
pub use engine::{CorruptPolicy, Frecency, FrecencyOptions, MatchTier, Scored};
pub use storage::{FrecencyData, JsonFileStore, KeyValueStore, MemoryStore};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Engine and logging configuration.
///
/// Every field is optional in the file form; `resource_type` must be set
/// before an engine can be opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Resource type whose history is used (`frecency_<resource_type>` key).
    pub resource_type: Option<String>,

    /// Max timestamps retained per selection entry. Default: 10
    pub timestamps_limit: Option<usize>,

    /// Max distinct ids tracked before the least recent is evicted. Default: 100
    pub recent_selections_limit: Option<usize>,

    /// Handling of an undecodable stored blob: `reset` (default) or `fail`.
    pub on_corrupt: CorruptPolicy,

    /// Directory for the JSON file store. Default: [`infrastructure::get_data_dir`]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive, e.g. `debug` or `frecent=trace`. Default: `"warn"`
    pub trace_level: Option<String>,

    /// If set, spans are also exported as OTLP JSON lines to this file.
    pub trace_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| FrecencyError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`FrecencyError::Config`] on syntax errors, unknown keys, or
    /// mistyped values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frecent::Config;
    ///
    /// let config = Config::from_toml("resource_type = \"users\"\ntimestamps_limit = 5")?;
    /// assert_eq!(config.resource_type.as_deref(), Some("users"));
    /// assert_eq!(config.timestamps_limit, Some(5));
    /// # Ok::<(), frecent::FrecencyError>(())
    /// ```
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| FrecencyError::Config(e.to_string()))
    }

    /// Parses configuration from a string map (environment-style settings).
    ///
    /// Unparsable numbers and policies fall back to their defaults with a
    /// debug log rather than failing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use frecent::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("resource_type".to_string(), "products".to_string());
    /// map.insert("recent_selections_limit".to_string(), "many".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.resource_type.as_deref(), Some("products"));
    /// assert_eq!(config.recent_selections_limit, None);
    /// ```
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let number = |key: &str| {
            text(key).and_then(|v| {
                v.parse::<usize>()
                    .map_err(|e| tracing::debug!(key = %key, value = %v, error = %e, "ignoring invalid number"))
                    .ok()
            })
        };

        let on_corrupt = text("on_corrupt")
            .and_then(|v| {
                v.parse::<CorruptPolicy>()
                    .map_err(|e| tracing::debug!(error = %e, "ignoring invalid corrupt-data policy"))
                    .ok()
            })
            .unwrap_or_default();

        Self {
            resource_type: text("resource_type"),
            timestamps_limit: number("timestamps_limit"),
            recent_selections_limit: number("recent_selections_limit"),
            on_corrupt,
            data_dir: text("data_dir").map(PathBuf::from),
            trace_level: text("trace_level"),
            trace_file: text("trace_file").map(PathBuf::from),
        }
    }

    /// Engine options derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FrecencyError::Config`] if no resource type is configured.
    pub fn frecency_options(&self) -> Result<FrecencyOptions> {
        let resource_type = self
            .resource_type
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| FrecencyError::Config("resource type is required".to_string()))?;

        Ok(FrecencyOptions {
            resource_type: resource_type.to_string(),
            timestamps_limit: self.timestamps_limit,
            recent_selections_limit: self.recent_selections_limit,
            on_corrupt: self.on_corrupt,
        })
    }

    /// Directory the JSON file store writes into, with `~` expanded.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.as_ref().map_or_else(infrastructure::get_data_dir, |dir| {
            PathBuf::from(infrastructure::expand_tilde(&dir.to_string_lossy()))
        })
    }
}

/// Opens a file-backed engine for the configured resource type.
///
/// # Errors
///
/// Returns an error if the configuration lacks a resource type, the data
/// directory cannot be created, or stored history cannot be loaded.
pub fn initialize(config: &Config) -> Result<Frecency<JsonFileStore>> {
    let options = config.frecency_options()?;
    let data_dir = config.resolved_data_dir();
    tracing::debug!(resource_type = %options.resource_type, data_dir = ?data_dir, "initializing frecency engine");

    let provider = JsonFileStore::new(data_dir)?;
    Frecency::new(options, provider)
}
