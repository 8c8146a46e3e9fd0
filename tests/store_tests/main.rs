//! Tests for the Store
//!
//! These tests verify:
//! - get/set/delete semantics
//! - Resize keeps every entry and the load factor bound
//! - Snapshot iteration sees a consistent view
//! - Concurrent readers and writers

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use verokv::store::{HashTable, INITIAL_CAPACITY, MAX_LOAD_FACTOR};
use verokv::{Store, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn key(i: usize) -> Vec<u8> {
    format!("key{}", i).into_bytes()
}

fn value(i: usize) -> Value {
    Value::from(format!("value{}", i).as_str())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let store = Store::new();
    store.set(b"hello".to_vec(), Value::from("world")).unwrap();

    assert_eq!(store.get(b"hello"), Some(Value::from("world")));
}

#[test]
fn test_get_missing_key() {
    let store = Store::new();
    assert_eq!(store.get(b"missing"), None);
}

#[test]
fn test_overwrite() {
    let store = Store::new();
    store.set(b"k".to_vec(), Value::from("v1")).unwrap();
    store.set(b"k".to_vec(), Value::from("v2")).unwrap();

    assert_eq!(store.get(b"k"), Some(Value::from("v2")));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_delete_twice() {
    let store = Store::new();
    store.set(b"k".to_vec(), Value::from("v")).unwrap();

    assert!(store.delete(b"k"));
    assert!(!store.delete(b"k"));
    assert_eq!(store.get(b"k"), None);
}

#[test]
fn test_delete_missing_key() {
    let store = Store::new();
    assert!(!store.delete(b"nothing"));
}

#[test]
fn test_binary_keys_and_values() {
    let store = Store::new();
    let k = vec![0u8, 255, 10, 13];
    let v = Value::from(vec![1u8, 0, 2]);
    store.set(k.clone(), v.clone()).unwrap();

    assert_eq!(store.get(&k), Some(v));
}

#[test]
fn test_empty_value() {
    let store = Store::new();
    store.set(b"k".to_vec(), Value::from("")).unwrap();

    let got = store.get(b"k").unwrap();
    assert!(got.is_empty());
}

// =============================================================================
// Resize Tests
// =============================================================================

#[test]
fn test_resize_preserves_entries() {
    let store = Store::new();
    for i in 0..10_000 {
        store.set(key(i), value(i)).unwrap();
    }

    assert_eq!(store.len(), 10_000);
    assert!(store.capacity() > INITIAL_CAPACITY);
    for i in 0..10_000 {
        assert_eq!(store.get(&key(i)), Some(value(i)), "key{} lost", i);
    }
}

#[test]
fn test_load_factor_stays_below_threshold() {
    let mut table = HashTable::new();
    for i in 0..5_000 {
        table.insert(key(i), value(i)).unwrap();
        assert!(
            table.load_factor() < MAX_LOAD_FACTOR,
            "load factor {} at {} entries",
            table.load_factor(),
            i + 1
        );
    }
}

#[test]
fn test_capacity_doubles() {
    let mut table = HashTable::new();
    let mut capacities = vec![table.capacity()];
    for i in 0..1_000 {
        table.insert(key(i), value(i)).unwrap();
        if *capacities.last().unwrap() != table.capacity() {
            capacities.push(table.capacity());
        }
    }

    for pair in capacities.windows(2) {
        assert_eq!(pair[1], pair[0] * 2);
    }
}

#[test]
fn test_no_duplicate_keys_after_resize() {
    let mut table = HashTable::new();
    for round in 0..3 {
        for i in 0..500 {
            table.insert(key(i), value(i + round)).unwrap();
        }
    }

    assert_eq!(table.len(), 500);
    assert_eq!(table.iter().count(), 500);
}

#[test]
fn test_remove_then_reinsert() {
    let mut table = HashTable::new();
    for i in 0..100 {
        table.insert(key(i), value(i)).unwrap();
    }
    for i in (0..100).step_by(2) {
        assert_eq!(table.remove(&key(i)), Some(value(i)));
    }
    assert_eq!(table.len(), 50);
    assert!(!table.contains_key(&key(0)));
    assert!(table.contains_key(&key(1)));

    table.insert(key(0), value(0)).unwrap();
    assert_eq!(table.get(&key(0)), Some(&value(0)));
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_entries_matches_content() {
    let store = Store::new();
    let mut expected = HashMap::new();
    for i in 0..200 {
        store.set(key(i), value(i)).unwrap();
        expected.insert(key(i), value(i));
    }
    store.delete(&key(7));
    expected.remove(&key(7));

    let got: HashMap<Vec<u8>, Value> = store.entries().into_iter().collect();
    assert_eq!(got, expected);
}

#[test]
fn test_for_each_order_is_deterministic_within_a_table() {
    let store = Store::new();
    for i in 0..64 {
        store.set(key(i), value(i)).unwrap();
    }

    let mut first = Vec::new();
    store.for_each(|k, _| first.push(k.to_vec()));
    let mut second = Vec::new();
    store.for_each(|k, _| second.push(k.to_vec()));

    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
}

#[test]
fn test_load_replaces_content() {
    let store = Store::new();
    store.set(b"old".to_vec(), Value::from("x")).unwrap();

    store
        .load(vec![(b"a".to_vec(), Value::from("1")), (b"b".to_vec(), Value::from("2"))])
        .unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get(b"old"), None);
    assert_eq!(store.get(b"b"), Some(Value::from("2")));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_distinct_keys() {
    let store = Arc::new(Store::new());
    let mut handles = Vec::new();

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..1_000 {
                let n = t * 1_000 + i;
                store.set(key(n), value(n)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8_000);
    for n in 0..8_000 {
        assert_eq!(store.get(&key(n)), Some(value(n)));
    }
}

#[test]
fn test_snapshot_iteration_during_writes_is_consistent() {
    // Every value seen by a scan must match its key; no key appears twice.
    let store = Arc::new(Store::new());
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..5_000 {
                store.set(key(i), value(i)).unwrap();
                if i % 3 == 0 {
                    store.delete(&key(i / 2));
                }
            }
        })
    };

    for _ in 0..50 {
        let entries = store.entries();
        for (k, v) in &entries {
            let n: usize = std::str::from_utf8(&k[3..]).unwrap().parse().unwrap();
            assert_eq!(v, &value(n));
        }
        let mut unique: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), entries.len());
    }

    writer.join().unwrap();
}
