//! File-backed persistence: layout on disk, sharing, and recovery.

use frecent::engine::{CorruptPolicy, Frecency, FrecencyOptions};
use frecent::storage::{storage_key, JsonFileStore, KeyValueStore};
use frecent::FrecencyError;
use serde_json::Value as JsonValue;
use tempfile::tempdir;

const NOW: i64 = 1_700_000_000_000;

#[test]
fn history_survives_reopening() {
    let dir = tempdir().unwrap();

    {
        let store = JsonFileStore::new(dir.path()).unwrap();
        let mut frecency = Frecency::new(FrecencyOptions::new("products"), store).unwrap();
        frecency.record_at("shoes", "p1", NOW).unwrap();
        frecency.record_at("shoes", "p1", NOW + 1).unwrap();
    }

    let store = JsonFileStore::new(dir.path()).unwrap();
    let frecency = Frecency::new(FrecencyOptions::new("products"), store).unwrap();
    let data = frecency.snapshot();

    assert_eq!(data.recent_selections.to_vec(), vec!["p1"]);
    assert_eq!(data.selections["p1"].times_selected, 2);
    assert_eq!(data.selections["p1"].selected_at, vec![NOW, NOW + 1]);
}

#[test]
fn stored_blob_uses_camel_case_layout() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path()).unwrap();
    let mut frecency = Frecency::new(FrecencyOptions::new("products"), store).unwrap();
    frecency.record_at("shoes", "p1", NOW).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("frecency_products.json")).unwrap();
    let blob: JsonValue = serde_json::from_str(&raw).unwrap();

    assert_eq!(blob["queries"]["shoes"][0]["id"], "p1");
    assert_eq!(blob["queries"]["shoes"][0]["timesSelected"], 1);
    assert_eq!(blob["selections"]["p1"]["selectedAt"][0], NOW);
    assert_eq!(blob["recentSelections"][0], "p1");
}

#[test]
fn two_processes_interleave_without_losing_ids() {
    let dir = tempdir().unwrap();
    let mut first = Frecency::new(
        FrecencyOptions::new("products"),
        JsonFileStore::new(dir.path()).unwrap(),
    )
    .unwrap();
    let mut second = Frecency::new(
        FrecencyOptions::new("products"),
        JsonFileStore::new(dir.path()).unwrap(),
    )
    .unwrap();

    first.record_at("a", "p1", NOW).unwrap();
    second.record_at("b", "p2", NOW + 1).unwrap();
    first.record_at("c", "p3", NOW + 2).unwrap();

    assert_eq!(first.snapshot().recent_selections.to_vec(), vec!["p3", "p2", "p1"]);
}

#[test]
fn corrupt_file_resets_by_default() {
    let dir = tempdir().unwrap();
    let mut store = JsonFileStore::new(dir.path()).unwrap();
    store.set(&storage_key("products"), "{not json").unwrap();

    let mut frecency = Frecency::new(FrecencyOptions::new("products"), store).unwrap();
    assert!(frecency.snapshot().is_empty());

    frecency.record_at("q", "p1", NOW).unwrap();
    let raw = std::fs::read_to_string(dir.path().join("frecency_products.json")).unwrap();
    assert!(serde_json::from_str::<JsonValue>(&raw).is_ok());
}

#[test]
fn corrupt_file_fails_when_requested() {
    let dir = tempdir().unwrap();
    let mut store = JsonFileStore::new(dir.path()).unwrap();
    store.set(&storage_key("products"), "[1, 2").unwrap();

    let options = FrecencyOptions::new("products").on_corrupt(CorruptPolicy::Fail);
    let result = Frecency::new(options, store);

    assert!(matches!(result, Err(FrecencyError::Corrupt { .. })));
}

#[test]
fn unusual_resource_types_map_to_safe_file_names() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path()).unwrap();
    let mut frecency = Frecency::new(FrecencyOptions::new("../shop/items"), store).unwrap();
    frecency.record_at("q", "p1", NOW).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();

    assert_eq!(entries.len(), 1);
    assert!(!entries[0].contains('/'));
    assert!(entries[0].starts_with("frecency_"));
}
