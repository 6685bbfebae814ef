use std::sync::Arc;
use std::thread;

use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::mpsc;

use super::*;
use crate::Accessors;
use crate::Layer;

fn store_from(value: Value) -> DocumentStore {
    match value {
        Value::Object(map) => DocumentStore::new(map),
        _ => panic!("test document must be a mapping"),
    }
}

#[test]
fn test_read_your_write() {
    let store = DocumentStore::default();
    store.set("db.host", json!("example.com")).unwrap();

    assert_eq!(store.get("db.host"), Some(json!("example.com")));
    assert_eq!(store.string("db.host"), "example.com");
}

#[test]
fn test_failed_write_publishes_nothing() {
    let store = store_from(json!({ "a": { "b": 1 } }));
    let before = store.snapshot();

    assert!(store.set("a.b.c", json!(2)).is_err());
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
}

#[test]
fn test_snapshot_is_immutable_across_writes() {
    let store = store_from(json!({ "k": "old" }));
    let snapshot = store.snapshot();

    store.set("k", json!("new")).unwrap();

    assert_eq!(snapshot["k"], json!("old"));
    assert_eq!(store.get("k"), Some(json!("new")));
}

#[test]
fn test_unsynchronized_mode_mutates_in_place() {
    let store = DocumentStore::with_mode(Map::new(), WriteMode::Unsynchronized);
    assert_eq!(store.write_mode(), WriteMode::Unsynchronized);

    store.set("a", json!(1)).unwrap();
    store.set("b.c", json!("x")).unwrap();
    assert!(store.set("a.z", json!(1)).is_err());

    assert_eq!(store.snapshot().as_ref(), &json!({ "a": 1, "b": { "c": "x" } }));
}

#[test]
fn test_unsynchronized_mode_leaves_held_snapshots_alone() {
    let store = DocumentStore::with_mode(Map::new(), WriteMode::Unsynchronized);
    store.set("a", json!(1)).unwrap();
    let held = store.snapshot();

    store.set("a", json!(2)).unwrap();

    assert_eq!(held["a"], json!(1));
    assert_eq!(store.get("a"), Some(json!(2)));
}

#[test]
fn test_merge_is_root_set() {
    let store = store_from(json!({ "a": { "a1": { "a11": "old", "a12": "Y" } } }));
    store.merge(json!({ "a": { "a1": { "a11": "X" } } })).unwrap();

    assert_eq!(store.get("a.a1.a11"), Some(json!("X")));
    assert_eq!(store.get("a.a1.a12"), Some(json!("Y")));
}

#[test]
fn test_set_notifies_watchers() {
    let store = DocumentStore::default();
    let (tx, mut rx) = mpsc::channel(1);
    store.watch(tx);

    store.set("k", json!("v")).unwrap();
    assert!(rx.try_recv().is_ok());

    // Failed writes are not changes
    assert!(store.set("k.sub", json!("v")).is_err());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_concurrent_synchronized_writers_lose_nothing() {
    let store = Arc::new(DocumentStore::default());

    thread::scope(|scope| {
        for i in 0..8 {
            let store = store.clone();
            scope.spawn(move || {
                for j in 0..50 {
                    store.set(&format!("w{i}.k{j}"), json!(j)).unwrap();
                }
            });
        }
    });

    for i in 0..8 {
        for j in 0..50 {
            assert_eq!(store.int(&format!("w{i}.k{j}")), j);
        }
    }
}
