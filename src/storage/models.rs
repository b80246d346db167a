//! Persisted frecency aggregate.
//!
//! This module defines the records stored for one resource type and the update
//! rules that keep its three indices consistent:
//!
//! - `queries`: query string → selections made under that query (insertion order)
//! - `selections`: candidate id → totals across all queries
//! - `recentSelections`: ids, most recently selected first, doubling as the
//!   eviction queue
//!
//! Every timestamp is Unix milliseconds.
//!
//! # Invariants
//!
//! After every [`FrecencyData::register_selection`] (and after
//! [`FrecencyData::enforce_limits`] on loaded data):
//!
//! 1. an id is in `recentSelections` exactly when it is a key of `selections`
//! 2. every query entry refers to an id present in `selections`
//! 3. no query maps to an empty sequence
//! 4. `recentSelections` holds no duplicates and at most `recent_selections` ids
//! 5. every `selectedAt` is non-empty, ascending and at most `timestamps` long,
//!    and every `timesSelected` is at least 1
//! 6. `selections[id].queries` is exactly the set of queries holding `id`
//!
//! [`FrecencyData::check_invariants`] verifies all six.

use super::buckets::BucketMap;
use super::recency::{RecencyList, Touch};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default cap on timestamps retained per selection entry.
pub const DEFAULT_TIMESTAMPS_LIMIT: usize = 10;

/// Default cap on distinct ids tracked in the recency list.
pub const DEFAULT_RECENT_SELECTIONS_LIMIT: usize = 100;

/// Size bounds applied to a [`FrecencyData`] aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Max timestamps retained per selection entry.
    pub timestamps: usize,
    /// Max distinct ids tracked.
    pub recent_selections: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timestamps: DEFAULT_TIMESTAMPS_LIMIT,
            recent_selections: DEFAULT_RECENT_SELECTIONS_LIMIT,
        }
    }
}

/// A candidate selected under one particular query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelection {
    /// Candidate identifier.
    pub id: String,
    /// Times this id was chosen for this query.
    pub times_selected: u32,
    /// Most recent selection times, ascending.
    pub selected_at: Vec<i64>,
}

impl QuerySelection {
    fn first(id: &str, now: i64) -> Self {
        Self {
            id: id.to_string(),
            times_selected: 1,
            selected_at: vec![now],
        }
    }
}

/// Selection totals for one candidate across all queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdSelection {
    /// Times this id was chosen under any query.
    pub times_selected: u32,
    /// Most recent selection times, ascending.
    pub selected_at: Vec<i64>,
    /// Queries under which this id has a [`QuerySelection`].
    #[serde(default)]
    pub queries: BTreeSet<String>,
}

/// The full persisted aggregate for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrecencyData {
    /// Selections grouped by the query they were made under.
    #[serde(default)]
    pub queries: BucketMap<QuerySelection>,
    /// Per-id totals.
    #[serde(default)]
    pub selections: BTreeMap<String, IdSelection>,
    /// Ids, most recently selected first.
    #[serde(default)]
    pub recent_selections: RecencyList,
}

/// Inserts `now` keeping `timestamps` ascending, then drops the oldest entries
/// beyond `limit`.
fn push_timestamp(timestamps: &mut Vec<i64>, now: i64, limit: usize) {
    let at = timestamps.partition_point(|&t| t <= now);
    timestamps.insert(at, now);
    trim_timestamps(timestamps, limit);
}

fn trim_timestamps(timestamps: &mut Vec<i64>, limit: usize) {
    let limit = limit.max(1);
    if timestamps.len() > limit {
        let excess = timestamps.len() - limit;
        timestamps.drain(..excess);
    }
}

impl FrecencyData {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent_selections.is_empty() && self.selections.is_empty() && self.queries.is_empty()
    }

    /// Applies one selection of `id` under `query` at time `now`.
    ///
    /// Updates the by-query and by-id indices, moves `id` to the front of the
    /// recency list and, if that overflowed the list, purges the evicted id from
    /// every index. Returns the evicted id, if any.
    pub fn register_selection(&mut self, query: &str, id: &str, now: i64, limits: Limits) -> Option<String> {
        self.update_by_query(query, id, now, limits.timestamps);
        self.update_by_id(query, id, now, limits.timestamps);

        match self.recent_selections.touch(id, limits.recent_selections) {
            Touch::Promoted | Touch::Inserted => None,
            Touch::Evicted(evicted) => {
                self.purge(&evicted);
                Some(evicted)
            }
        }
    }

    fn update_by_query(&mut self, query: &str, id: &str, now: i64, timestamps_limit: usize) {
        if let Some(previous) = self.queries.find_mut(query, |s| s.id == id) {
            previous.times_selected = previous.times_selected.saturating_add(1);
            push_timestamp(&mut previous.selected_at, now, timestamps_limit);
            return;
        }
        self.queries.push(query, QuerySelection::first(id, now));
    }

    fn update_by_id(&mut self, query: &str, id: &str, now: i64, timestamps_limit: usize) {
        if let Some(previous) = self.selections.get_mut(id) {
            previous.times_selected = previous.times_selected.saturating_add(1);
            push_timestamp(&mut previous.selected_at, now, timestamps_limit);
            previous.queries.insert(query.to_string());
            return;
        }
        self.selections.insert(
            id.to_string(),
            IdSelection {
                times_selected: 1,
                selected_at: vec![now],
                queries: BTreeSet::from([query.to_string()]),
            },
        );
    }

    /// Removes `id` from `selections` and from every query that references it.
    ///
    /// Queries left empty are dropped. The recency list is not touched.
    fn purge(&mut self, id: &str) {
        let Some(selection) = self.selections.remove(id) else {
            return;
        };
        for query in &selection.queries {
            self.queries.remove_where(query, |s| s.id == id);
        }
    }

    /// Brings a loaded aggregate within `limits` and repairs cross-index drift.
    ///
    /// Data written under larger limits (or by another writer) is trimmed: old
    /// timestamps are dropped, the least recent ids beyond the recency cap are
    /// evicted with a full purge, and entries orphaned from the recency list are
    /// removed. Duplicate ids within one query are merged, and entries that were
    /// never selected or carry no timestamps are dropped. Returns the number of
    /// ids dropped.
    pub fn enforce_limits(&mut self, limits: Limits) -> usize {
        let mut dropped = 0;

        self.queries.retain_buckets(|query, entries| {
            let repaired = merge_duplicate_entries(entries);
            if repaired > 0 {
                tracing::debug!(query = %query, repaired = repaired, "dropped malformed query entries");
            }
        });
        self.selections
            .retain(|_, s| s.times_selected > 0 && !s.selected_at.is_empty());

        while self.recent_selections.len() > limits.recent_selections.max(1) {
            let Some(evicted) = self.recent_selections.pop_back() else {
                break;
            };
            self.purge(&evicted);
            dropped += 1;
        }

        let recent = &self.recent_selections;
        let before = self.selections.len();
        self.selections.retain(|id, _| recent.contains(id));
        dropped += before - self.selections.len();

        let untracked: Vec<String> = self
            .recent_selections
            .iter()
            .filter(|id| !self.selections.contains_key(*id))
            .map(str::to_string)
            .collect();
        for id in &untracked {
            self.recent_selections.remove(id);
        }
        dropped += untracked.len();

        let keys: Vec<String> = self.queries.keys().map(str::to_string).collect();
        let selections = &self.selections;
        for key in &keys {
            self.queries.remove_where(key, |s| !selections.contains_key(&s.id));
        }
        self.queries.compact_all();

        for entry in self.queries.values_mut() {
            entry.selected_at.sort_unstable();
            trim_timestamps(&mut entry.selected_at, limits.timestamps);
        }

        for selection in self.selections.values_mut() {
            selection.queries.clear();
            selection.selected_at.sort_unstable();
            trim_timestamps(&mut selection.selected_at, limits.timestamps);
        }
        for (query, entries) in self.queries.iter() {
            for entry in entries {
                if let Some(selection) = self.selections.get_mut(&entry.id) {
                    selection.queries.insert(query.to_string());
                }
            }
        }

        dropped
    }

    /// Checks every structural invariant of the aggregate against `limits`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self, limits: Limits) -> Result<(), String> {
        let recent: Vec<&str> = self.recent_selections.iter().collect();
        let unique: BTreeSet<&str> = recent.iter().copied().collect();
        if unique.len() != recent.len() {
            return Err(format!("recentSelections holds duplicates: {recent:?}"));
        }
        if recent.len() > limits.recent_selections {
            return Err(format!(
                "recentSelections has {} ids, limit {}",
                recent.len(),
                limits.recent_selections
            ));
        }

        let selected: BTreeSet<&str> = self.selections.keys().map(String::as_str).collect();
        if selected != unique {
            return Err(format!(
                "selections keys {selected:?} differ from recentSelections {unique:?}"
            ));
        }

        let mut expected_refs: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (query, entries) in self.queries.iter() {
            if entries.is_empty() {
                return Err(format!("query {query:?} maps to an empty sequence"));
            }
            let mut seen = BTreeSet::new();
            for entry in entries {
                if !seen.insert(entry.id.as_str()) {
                    return Err(format!("query {query:?} lists {:?} twice", entry.id));
                }
                if !self.selections.contains_key(&entry.id) {
                    return Err(format!("query {query:?} references evicted id {:?}", entry.id));
                }
                if entry.times_selected == 0 {
                    return Err(format!("queries[{query:?}][{:?}] was never selected", entry.id));
                }
                check_timestamps(&entry.selected_at, limits.timestamps)
                    .map_err(|e| format!("queries[{query:?}][{:?}]: {e}", entry.id))?;
                expected_refs.entry(entry.id.as_str()).or_default().insert(query);
            }
        }

        for (id, selection) in &self.selections {
            if selection.times_selected == 0 {
                return Err(format!("selections[{id:?}] was never selected"));
            }
            check_timestamps(&selection.selected_at, limits.timestamps)
                .map_err(|e| format!("selections[{id:?}]: {e}"))?;
            let actual: BTreeSet<&str> = selection.queries.iter().map(String::as_str).collect();
            let expected = expected_refs.remove(id.as_str()).unwrap_or_default();
            if actual != expected {
                return Err(format!(
                    "selections[{id:?}].queries is {actual:?}, queries index says {expected:?}"
                ));
            }
        }

        Ok(())
    }
}

/// Merges entries that repeat an id within one query bucket and drops entries
/// with no selections or no timestamps. Returns how many entries went away.
fn merge_duplicate_entries(entries: &mut Vec<QuerySelection>) -> usize {
    let before = entries.len();
    let mut merged: Vec<QuerySelection> = Vec::with_capacity(before);
    for entry in entries.drain(..) {
        if entry.times_selected == 0 || entry.selected_at.is_empty() {
            continue;
        }
        match merged.iter_mut().find(|m| m.id == entry.id) {
            Some(existing) => {
                existing.times_selected = existing.times_selected.saturating_add(entry.times_selected);
                existing.selected_at.extend(entry.selected_at);
            }
            None => merged.push(entry),
        }
    }
    *entries = merged;
    before - entries.len()
}

fn check_timestamps(timestamps: &[i64], limit: usize) -> Result<(), String> {
    if timestamps.is_empty() {
        return Err("selectedAt is empty".to_string());
    }
    if timestamps.len() > limit {
        return Err(format!("selectedAt has {} entries, limit {limit}", timestamps.len()));
    }
    if timestamps.windows(2).any(|w| w[0] > w[1]) {
        return Err(format!("selectedAt is not ascending: {timestamps:?}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 60 * 60 * 1000;

    fn limits(timestamps: usize, recent_selections: usize) -> Limits {
        Limits {
            timestamps,
            recent_selections,
        }
    }

    #[test]
    fn first_selection_populates_every_index() {
        let mut data = FrecencyData::new();
        let evicted = data.register_selection("shoes", "p1", 1_000, Limits::default());

        assert_eq!(evicted, None);
        assert_eq!(
            data.queries.get("shoes"),
            Some(
                &[QuerySelection {
                    id: "p1".to_string(),
                    times_selected: 1,
                    selected_at: vec![1_000],
                }][..]
            )
        );
        let by_id = &data.selections["p1"];
        assert_eq!(by_id.times_selected, 1);
        assert_eq!(by_id.selected_at, vec![1_000]);
        assert!(by_id.queries.contains("shoes"));
        assert_eq!(data.recent_selections.to_vec(), vec!["p1"]);
        data.check_invariants(Limits::default()).unwrap();
    }

    #[test]
    fn repeated_selection_keeps_most_recent_timestamps() {
        let mut data = FrecencyData::new();
        let limits = limits(3, 10);
        for i in 0..5 {
            data.register_selection("q", "a", i * HOUR, limits);
        }

        let entry = &data.queries.get("q").unwrap()[0];
        assert_eq!(entry.times_selected, 5);
        assert_eq!(entry.selected_at, vec![2 * HOUR, 3 * HOUR, 4 * HOUR]);
        assert_eq!(data.selections["a"].selected_at, vec![2 * HOUR, 3 * HOUR, 4 * HOUR]);
        assert_eq!(data.selections["a"].times_selected, 5);
        data.check_invariants(limits).unwrap();
    }

    #[test]
    fn clock_stepping_backwards_keeps_timestamps_ascending() {
        let mut data = FrecencyData::new();
        data.register_selection("q", "a", 5_000, Limits::default());
        data.register_selection("q", "a", 3_000, Limits::default());

        assert_eq!(data.selections["a"].selected_at, vec![3_000, 5_000]);
        data.check_invariants(Limits::default()).unwrap();
    }

    #[test]
    fn same_id_under_new_query_adds_back_reference() {
        let mut data = FrecencyData::new();
        data.register_selection("red shoes", "p1", 1, Limits::default());
        data.register_selection("shoes", "p1", 2, Limits::default());
        data.register_selection("shoes", "p2", 3, Limits::default());

        let refs: Vec<&str> = data.selections["p1"].queries.iter().map(String::as_str).collect();
        assert_eq!(refs, vec!["red shoes", "shoes"]);
        assert_eq!(data.selections["p1"].times_selected, 2);
        let ids: Vec<&str> = data.queries.get("shoes").unwrap().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        data.check_invariants(Limits::default()).unwrap();
    }

    #[test]
    fn eviction_purges_every_index() {
        let mut data = FrecencyData::new();
        let limits = limits(10, 2);
        data.register_selection("one", "p1", 1, limits);
        data.register_selection("shared", "p1", 2, limits);
        data.register_selection("shared", "p2", 3, limits);
        let evicted = data.register_selection("three", "p3", 4, limits);

        assert_eq!(evicted.as_deref(), Some("p1"));
        assert_eq!(data.recent_selections.to_vec(), vec!["p3", "p2"]);
        assert!(!data.selections.contains_key("p1"));
        assert!(!data.queries.contains_key("one"));
        let shared: Vec<&str> = data.queries.get("shared").unwrap().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(shared, vec!["p2"]);
        data.check_invariants(limits).unwrap();
    }

    #[test]
    fn reselecting_tracked_id_does_not_evict() {
        let mut data = FrecencyData::new();
        let limits = limits(10, 2);
        data.register_selection("a", "p1", 1, limits);
        data.register_selection("b", "p2", 2, limits);
        let evicted = data.register_selection("c", "p1", 3, limits);

        assert_eq!(evicted, None);
        assert_eq!(data.recent_selections.to_vec(), vec!["p1", "p2"]);
        data.check_invariants(limits).unwrap();
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut data = FrecencyData::new();
        data.register_selection("q", "a", 7, Limits::default());

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "queries": { "q": [{ "id": "a", "timesSelected": 1, "selectedAt": [7] }] },
                "selections": { "a": { "timesSelected": 1, "selectedAt": [7], "queries": ["q"] } },
                "recentSelections": ["a"]
            })
        );

        let decoded: FrecencyData = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn enforce_limits_shrinks_data_written_under_larger_limits() {
        let mut data = FrecencyData::new();
        let wide = limits(5, 5);
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            for t in 0..4 {
                data.register_selection("q", id, (i as i64) * 10 + t, wide);
            }
        }

        let narrow = limits(2, 2);
        let dropped = data.enforce_limits(narrow);

        assert_eq!(dropped, 2);
        assert_eq!(data.recent_selections.to_vec(), vec!["d", "c"]);
        assert_eq!(data.selections["d"].selected_at, vec![32, 33]);
        assert_eq!(data.queries.get("q").unwrap().len(), 2);
        data.check_invariants(narrow).unwrap();
    }

    #[test]
    fn enforce_limits_repairs_orphans_and_back_references() {
        let mut data: FrecencyData = serde_json::from_value(serde_json::json!({
            "queries": {
                "q": [{ "id": "a", "timesSelected": 1, "selectedAt": [1] },
                      { "id": "ghost", "timesSelected": 1, "selectedAt": [1] }],
                "empty": []
            },
            "selections": {
                "a": { "timesSelected": 1, "selectedAt": [1], "queries": [] },
                "stale": { "timesSelected": 1, "selectedAt": [1], "queries": ["q"] }
            },
            "recentSelections": ["a", "unknown"]
        }))
        .unwrap();

        data.enforce_limits(Limits::default());

        assert_eq!(data.recent_selections.to_vec(), vec!["a"]);
        assert!(!data.selections.contains_key("stale"));
        assert!(!data.queries.contains_key("empty"));
        assert!(data.selections["a"].queries.contains("q"));
        data.check_invariants(Limits::default()).unwrap();
    }

    #[test]
    fn enforce_limits_merges_duplicates_and_drops_empty_entries() {
        let mut data: FrecencyData = serde_json::from_value(serde_json::json!({
            "queries": {
                "q": [{ "id": "a", "timesSelected": 1, "selectedAt": [5] },
                      { "id": "a", "timesSelected": 2, "selectedAt": [3, 9] },
                      { "id": "b", "timesSelected": 1, "selectedAt": [] }],
                "r": [{ "id": "b", "timesSelected": 0, "selectedAt": [4] }]
            },
            "selections": {
                "a": { "timesSelected": 3, "selectedAt": [3, 5, 9], "queries": ["q"] },
                "b": { "timesSelected": 2, "selectedAt": [4], "queries": ["q", "r"] },
                "c": { "timesSelected": 0, "selectedAt": [], "queries": [] }
            },
            "recentSelections": ["c", "b", "a"]
        }))
        .unwrap();
        assert!(data.check_invariants(Limits::default()).is_err());

        data.enforce_limits(Limits::default());

        let q = data.queries.get("q").unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].times_selected, 3);
        assert_eq!(q[0].selected_at, vec![3, 5, 9]);
        assert!(!data.queries.contains_key("r"));
        assert!(data.selections["b"].queries.is_empty());
        assert_eq!(data.recent_selections.to_vec(), vec!["b", "a"]);
        data.check_invariants(Limits::default()).unwrap();
    }

    #[test]
    fn check_invariants_reports_dangling_query_entry() {
        let mut data = FrecencyData::new();
        data.register_selection("q", "a", 1, Limits::default());
        data.selections.remove("a");

        assert!(data.check_invariants(Limits::default()).is_err());
    }
}
