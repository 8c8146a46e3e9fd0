//! Tests for snapshots
//!
//! These tests verify:
//! - The entry set survives a save and load
//! - The manifest is kept only when it matches the data file
//! - A damaged data file yields its readable prefix
//! - Failed or finished saves leave no temporary files behind

use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;
use verokv::snapshot::{
    decode_entries, SnapshotManager, SnapshotMeta, META_FILENAME, SNAPSHOT_FILENAME,
};
use verokv::{Value, VeroError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_manager() -> (TempDir, SnapshotManager) {
    let dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(dir.path());
    (dir, manager)
}

fn sample_entries(n: usize) -> Vec<(Vec<u8>, Value)> {
    (0..n)
        .map(|i| {
            (
                format!("key{}", i).into_bytes(),
                Value::from(format!("value{}", i).as_str()),
            )
        })
        .collect()
}

fn as_map(entries: Vec<(Vec<u8>, Value)>) -> HashMap<Vec<u8>, Value> {
    entries.into_iter().collect()
}

// =============================================================================
// Save / Load Tests
// =============================================================================

#[test]
fn test_save_then_load_same_entry_set() {
    let (_dir, manager) = setup_temp_manager();
    let entries = sample_entries(500);

    let info = manager.save(&entries, SnapshotMeta::new(120, 40)).unwrap();
    assert_eq!(info.entries, 500);
    assert_eq!(info.bytes, fs::metadata(manager.snapshot_path()).unwrap().len());

    let loaded = manager.load().unwrap().unwrap();
    assert!(loaded.corruption.is_none());
    assert_eq!(as_map(loaded.entries), as_map(entries));

    let meta = loaded.meta.unwrap();
    assert_eq!(meta.append_log_offset, 120);
    assert_eq!(meta.batch_log_offset, 40);
    assert_eq!(meta.entry_count, 500);
}

#[test]
fn test_load_without_snapshot() {
    let (_dir, manager) = setup_temp_manager();
    assert!(manager.load().unwrap().is_none());
}

#[test]
fn test_empty_snapshot() {
    let (_dir, manager) = setup_temp_manager();
    manager.save(&[], SnapshotMeta::new(0, 0)).unwrap();

    assert_eq!(fs::metadata(manager.snapshot_path()).unwrap().len(), 0);
    let loaded = manager.load().unwrap().unwrap();
    assert!(loaded.entries.is_empty());
    assert!(loaded.meta.is_some());
}

#[test]
fn test_save_replaces_previous() {
    let (_dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(10), SnapshotMeta::new(1, 0)).unwrap();
    manager.save(&sample_entries(3), SnapshotMeta::new(2, 0)).unwrap();

    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 3);
    assert_eq!(loaded.meta.unwrap().append_log_offset, 2);
}

#[test]
fn test_no_temporary_files_left() {
    let (dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(5), SnapshotMeta::new(0, 0)).unwrap();

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec![SNAPSHOT_FILENAME.to_string(), META_FILENAME.to_string()]);
}

#[test]
fn test_save_into_missing_directory_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let manager = SnapshotManager::new(&dir.path().join("does-not-exist"));

    let err = manager
        .save(&sample_entries(2), SnapshotMeta::new(0, 0))
        .unwrap_err();
    assert!(matches!(err, VeroError::SnapshotIo(_)));
}

#[test]
fn test_failed_manifest_write_keeps_previous_snapshot() {
    let (dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(1), SnapshotMeta::new(8, 0)).unwrap();
    let data_before = fs::read(manager.snapshot_path()).unwrap();
    let meta_before = fs::read(manager.meta_path()).unwrap();

    // A directory in the way makes the manifest temp file unwritable
    let blocker = dir.path().join(format!("{}.tmp", META_FILENAME));
    fs::create_dir(&blocker).unwrap();

    let err = manager
        .save(&sample_entries(2), SnapshotMeta::new(16, 0))
        .unwrap_err();
    assert!(matches!(err, VeroError::SnapshotIo(_)));

    assert_eq!(fs::read(manager.snapshot_path()).unwrap(), data_before);
    assert_eq!(fs::read(manager.meta_path()).unwrap(), meta_before);
    assert!(!dir
        .path()
        .join(format!("{}.tmp", SNAPSHOT_FILENAME))
        .exists());

    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 1);
    assert_eq!(loaded.meta.unwrap().append_log_offset, 8);

    fs::remove_dir(&blocker).unwrap();
    manager.save(&sample_entries(2), SnapshotMeta::new(16, 0)).unwrap();
    assert_eq!(manager.load().unwrap().unwrap().entries.len(), 2);
}

// =============================================================================
// Manifest Tests
// =============================================================================

#[test]
fn test_meta_crc_mismatch_is_dropped() {
    let (_dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(4), SnapshotMeta::new(9, 0)).unwrap();

    let mut bytes = fs::read(manager.meta_path()).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(manager.meta_path(), &bytes).unwrap();

    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 4);
    assert!(loaded.meta.is_none());
}

#[test]
fn test_meta_for_other_data_is_dropped() {
    let (dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(4), SnapshotMeta::new(9, 0)).unwrap();
    let stale_meta = fs::read(manager.meta_path()).unwrap();

    manager.save(&sample_entries(6), SnapshotMeta::new(15, 0)).unwrap();
    fs::write(dir.path().join(META_FILENAME), stale_meta).unwrap();

    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 6);
    assert!(loaded.meta.is_none());
}

#[test]
fn test_missing_meta_still_loads_data() {
    let (_dir, manager) = setup_temp_manager();
    manager.save(&sample_entries(3), SnapshotMeta::new(9, 0)).unwrap();
    fs::remove_file(manager.meta_path()).unwrap();

    let loaded = manager.load().unwrap().unwrap();
    assert_eq!(loaded.entries.len(), 3);
    assert!(loaded.meta.is_none());
}

#[test]
fn test_meta_serialization_checks_crc() {
    let meta = SnapshotMeta::new(7, 8);
    let bytes = meta.serialize().unwrap();
    assert_eq!(SnapshotMeta::deserialize(&bytes).unwrap(), meta);

    assert!(matches!(
        SnapshotMeta::deserialize(&bytes[..2]),
        Err(VeroError::CorruptSnapshot(_))
    ));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_truncated_data_keeps_prefix() {
    let (_dir, manager) = setup_temp_manager();
    let entries = sample_entries(10);
    manager.save(&entries, SnapshotMeta::new(0, 0)).unwrap();

    let data = fs::read(manager.snapshot_path()).unwrap();
    fs::write(manager.snapshot_path(), &data[..data.len() - 3]).unwrap();

    let loaded = manager.load().unwrap().unwrap();
    assert!(loaded.corruption.is_some());
    assert!(loaded.meta.is_none());
    assert_eq!(loaded.entries.len(), 9);
    assert_eq!(&loaded.entries[..], &entries[..9]);
}

#[test]
fn test_decode_garbage_tail() {
    let mut data = Vec::new();
    data.extend_from_slice(&1u64.to_le_bytes());
    data.push(b'k');
    data.extend_from_slice(&1u64.to_le_bytes());
    data.push(b'v');
    data.extend_from_slice(&[0xde, 0xad]);

    let decoded = decode_entries(data.into());
    assert_eq!(decoded.entries, vec![(b"k".to_vec(), Value::from("v"))]);
    assert!(decoded.corruption.is_some());
}
