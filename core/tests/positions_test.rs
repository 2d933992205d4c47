//! Position store tests against both storage backends

use flowboard_core::diagram::Position;
use flowboard_core::storage::KeyValueStoreExt;
use flowboard_core::{InMemoryStore, KeyValueStore, PositionMap, PositionStore, RocksDbStore};
use std::sync::Arc;
use tempfile::TempDir;

fn map(entries: &[(&str, f64, f64)]) -> PositionMap {
    entries
        .iter()
        .map(|(n, x, y)| (n.to_string(), Position::new(*x, *y)))
        .collect()
}

fn memory_store() -> (Arc<InMemoryStore>, PositionStore) {
    let store = Arc::new(InMemoryStore::new());
    let positions = PositionStore::new(store.clone());
    (store, positions)
}

#[test]
fn key_is_per_diagram() {
    assert_eq!(PositionStore::key("ops.json"), "diagram-positions-ops.json");
}

#[test]
fn load_without_saved_layout_is_empty() {
    let (_, positions) = memory_store();
    assert!(positions.load("ops.json").is_empty());
}

#[test]
fn merge_keeps_untouched_nodes() {
    let (_, positions) = memory_store();
    positions
        .merge("ops.json", &map(&[("a", 1.0, 2.0), ("b", 3.0, 4.0)]))
        .unwrap();
    let merged = positions.merge("ops.json", &map(&[("b", 30.0, 40.0)])).unwrap();

    assert_eq!(merged, map(&[("a", 1.0, 2.0), ("b", 30.0, 40.0)]));
    assert_eq!(positions.load("ops.json"), merged);
}

#[test]
fn diagrams_do_not_share_layouts() {
    let (_, positions) = memory_store();
    positions.merge("one.json", &map(&[("a", 1.0, 1.0)])).unwrap();
    assert!(positions.load("two.json").is_empty());
}

#[test]
fn corrupt_blob_reads_as_empty() {
    let (store, positions) = memory_store();
    store
        .put_raw(&PositionStore::key("ops.json"), b"{not json".to_vec())
        .unwrap();
    assert!(positions.load("ops.json").is_empty());

    // and the next save replaces it
    positions.merge("ops.json", &map(&[("a", 5.0, 5.0)])).unwrap();
    assert_eq!(positions.load("ops.json"), map(&[("a", 5.0, 5.0)]));
}

#[test]
fn clear_removes_the_layout() {
    let (store, positions) = memory_store();
    positions.merge("ops.json", &map(&[("a", 1.0, 1.0)])).unwrap();
    positions.clear("ops.json").unwrap();

    assert!(positions.load("ops.json").is_empty());
    assert!(store.is_empty());
}

#[test]
fn stored_blob_is_a_plain_name_to_xy_object() {
    let (store, positions) = memory_store();
    positions.merge("ops.json", &map(&[("a", 1.5, 2.0)])).unwrap();

    let raw: serde_json::Value = store
        .get_json(&PositionStore::key("ops.json"))
        .unwrap()
        .unwrap();
    assert_eq!(raw, serde_json::json!({ "a": { "x": 1.5, "y": 2.0 } }));
}

#[test]
fn rocksdb_layout_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        let positions = PositionStore::new(store);
        positions.merge("ops.json", &map(&[("a", 10.0, 20.0)])).unwrap();
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let positions = PositionStore::new(store);
    assert_eq!(positions.load("ops.json"), map(&[("a", 10.0, 20.0)]));

    positions.clear("ops.json").unwrap();
    assert!(positions.load("ops.json").is_empty());
}
