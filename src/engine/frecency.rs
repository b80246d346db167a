//! Per-resource-type frecency engine.
//!
//! [`Frecency`] is the long-lived object callers hold: it records selections
//! through its [`FrecencyStore`] and ranks result lists against the store's
//! cached snapshot. Ranking never touches the persistence provider.

use super::scorer::{Scored, Scorer};
use super::store::{FrecencyOptions, FrecencyStore};
use crate::domain::error::Result;
use crate::storage::{FrecencyData, KeyValueStore};
use serde_json::Value as JsonValue;

/// Field attached to each ranked JSON record with its frecency score.
pub const SCORE_FIELD: &str = "_frecencyScore";

/// Frecency engine for one resource type.
///
/// # Examples
///
/// ```
/// use frecent::engine::{Frecency, FrecencyOptions};
/// use frecent::storage::MemoryStore;
/// use serde_json::json;
///
/// let mut frecency = Frecency::new(FrecencyOptions::new("products"), MemoryStore::new())?;
/// frecency.record("shoes", "p2")?;
///
/// let ranked = frecency.rank_records("shoes", vec![json!({"id": "p1"}), json!({"id": "p2"})], "id");
/// assert_eq!(ranked[0]["id"], "p2");
/// assert_eq!(ranked[1]["_frecencyScore"], 0.0);
/// # Ok::<(), frecent::FrecencyError>(())
/// ```
#[derive(Debug)]
pub struct Frecency<S: KeyValueStore> {
    store: FrecencyStore<S>,
}

impl<S: KeyValueStore> Frecency<S> {
    /// Creates the engine and loads persisted history.
    ///
    /// # Errors
    ///
    /// See [`FrecencyStore::open`].
    pub fn new(options: FrecencyOptions, provider: S) -> Result<Self> {
        Ok(Self {
            store: FrecencyStore::open(options, provider)?,
        })
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &FrecencyStore<S> {
        &self.store
    }

    /// Cached history used for ranking.
    #[must_use]
    pub fn snapshot(&self) -> &FrecencyData {
        self.store.snapshot()
    }

    /// Re-reads persisted history, picking up other writers' selections.
    ///
    /// # Errors
    ///
    /// See [`FrecencyStore::reload`].
    pub fn reload(&mut self) -> Result<()> {
        self.store.reload()
    }

    /// Records that `selected_id` was picked for `search_query`. Empty inputs
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence provider fails.
    pub fn record(&mut self, search_query: &str, selected_id: &str) -> Result<()> {
        self.store.record(search_query, selected_id)
    }

    /// [`Frecency::record`] with an explicit timestamp (Unix milliseconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence provider fails.
    pub fn record_at(&mut self, search_query: &str, selected_id: &str, now: i64) -> Result<()> {
        self.store.record_at(search_query, selected_id, now)
    }

    /// Ranks `candidates` for `search_query` as of now.
    ///
    /// See [`Scorer::rank`] for the ordering rules.
    pub fn rank<T, F>(&self, search_query: &str, candidates: Vec<T>, id_of: F) -> Vec<Scored<T>>
    where
        F: Fn(&T) -> Option<&str>,
    {
        self.rank_at(search_query, candidates, id_of, crate::engine::now_millis())
    }

    /// [`Frecency::rank`] evaluated at `now` (Unix milliseconds).
    pub fn rank_at<T, F>(&self, search_query: &str, candidates: Vec<T>, id_of: F, now: i64) -> Vec<Scored<T>>
    where
        F: Fn(&T) -> Option<&str>,
    {
        Scorer::new(self.store.snapshot(), now).rank(search_query, candidates, id_of)
    }

    /// Ranks JSON records by the id found under `id_field`.
    ///
    /// String and numeric ids are accepted; records without a usable id score
    /// zero. Every object record gets a [`SCORE_FIELD`] entry; no other field
    /// is modified.
    #[must_use]
    pub fn rank_records(&self, search_query: &str, records: Vec<JsonValue>, id_field: &str) -> Vec<JsonValue> {
        self.rank_records_at(search_query, records, id_field, crate::engine::now_millis())
    }

    /// [`Frecency::rank_records`] evaluated at `now` (Unix milliseconds).
    #[must_use]
    pub fn rank_records_at(
        &self,
        search_query: &str,
        records: Vec<JsonValue>,
        id_field: &str,
        now: i64,
    ) -> Vec<JsonValue> {
        let keyed: Vec<(JsonValue, Option<String>)> = records
            .into_iter()
            .map(|record| {
                let id = record_id(&record, id_field);
                (record, id)
            })
            .collect();

        self.rank_at(search_query, keyed, |(_, id)| id.as_deref(), now)
            .into_iter()
            .map(|scored| {
                let (mut record, _) = scored.item;
                if let Some(fields) = record.as_object_mut() {
                    fields.insert(SCORE_FIELD.to_string(), JsonValue::from(scored.score));
                }
                record
            })
            .collect()
    }
}

fn record_id(record: &JsonValue, id_field: &str) -> Option<String> {
    match record.get(id_field)? {
        JsonValue::String(id) => Some(id.clone()),
        JsonValue::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn engine() -> Frecency<MemoryStore> {
        Frecency::new(FrecencyOptions::new("products"), MemoryStore::new()).unwrap()
    }

    #[test]
    fn rank_records_preserves_business_fields() {
        let mut frecency = engine();
        frecency.record_at("x", "b", NOW).unwrap();

        let records = vec![
            json!({"id": "a", "name": "Alpha", "price": 3}),
            json!({"id": "b", "name": "Beta", "tags": ["x"]}),
        ];
        let ranked = frecency.rank_records_at("x", records, "id", NOW);

        assert_eq!(
            ranked,
            vec![
                json!({"id": "b", "name": "Beta", "tags": ["x"], "_frecencyScore": 100.0}),
                json!({"id": "a", "name": "Alpha", "price": 3, "_frecencyScore": 0.0}),
            ]
        );
    }

    #[test]
    fn rank_records_accepts_numeric_ids_and_tolerates_missing_ones() {
        let mut frecency = engine();
        frecency.record_at("x", "42", NOW).unwrap();

        let records = vec![json!({"name": "no id"}), json!("bare"), json!({"id": 42})];
        let ranked = frecency.rank_records_at("x", records, "id", NOW);

        assert_eq!(ranked[0], json!({"id": 42, "_frecencyScore": 100.0}));
        assert_eq!(ranked[1], json!({"name": "no id", "_frecencyScore": 0.0}));
        assert_eq!(ranked[2], json!("bare"));
    }

    #[test]
    fn extreme_stored_timestamps_score_zero_instead_of_overflowing() {
        let mut provider = MemoryStore::new();
        let blob = json!({
            "queries": {"q": [{"id": "a", "timesSelected": 2, "selectedAt": [i64::MIN]}]},
            "selections": {"a": {"timesSelected": 2, "selectedAt": [i64::MIN], "queries": ["q"]}},
            "recentSelections": ["a"]
        });
        provider.set("frecency_products", &blob.to_string()).unwrap();

        let frecency = Frecency::new(FrecencyOptions::new("products"), provider).unwrap();
        let ranked = frecency.rank_at("q", vec!["b", "a"], |c| Some(*c), NOW);

        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| s.score == 0.0));
        assert_eq!(ranked[0].item, "b");
    }

    #[test]
    fn rank_uses_the_cached_snapshot_only() {
        let provider = MemoryStore::new();
        let mut frecency = Frecency::new(FrecencyOptions::new("products"), provider.clone()).unwrap();
        frecency.record_at("x", "a", NOW).unwrap();

        provider.fail_reads(true);
        let ranked = frecency.rank_at("x", vec!["b", "a"], |c| Some(*c), NOW);
        assert_eq!(ranked[0].item, "a");
    }
}
