//! Hash table implementation
//!
//! Separately chained table with power-of-two capacity.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

use crate::error::{Result, VeroError};

use super::Value;

/// Bucket count of a freshly created table
pub const INITIAL_CAPACITY: usize = 16;

/// Load factor the table never reaches: live / capacity < 0.7
pub const MAX_LOAD_FACTOR: f64 = 0.7;

// Integer form of MAX_LOAD_FACTOR, avoids float comparisons on the hot path
const LOAD_NUMERATOR: usize = 7;
const LOAD_DENOMINATOR: usize = 10;

#[derive(Debug)]
struct Entry {
    key: Vec<u8>,
    value: Value,
}

/// Chained hash table of byte-string keys
pub struct HashTable {
    /// Bucket array, length is always a power of two
    buckets: Vec<Vec<Entry>>,

    /// Number of live entries
    len: usize,

    /// Per-table random hashing state
    hasher: RandomState,
}

impl HashTable {
    /// Create an empty table with `INITIAL_CAPACITY` buckets
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty table with at least `capacity` buckets
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            buckets: empty_buckets(capacity),
            len: 0,
            hasher: RandomState::new(),
        }
    }

    /// Look up a key
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        let bucket = &self.buckets[self.bucket_index(key)];
        bucket
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Insert or overwrite a key.
    ///
    /// Returns the previous value if the key existed. Growing the table happens
    /// before the new entry is linked in; if growth fails the table is unchanged.
    pub fn insert(&mut self, key: Vec<u8>, value: Value) -> Result<Option<Value>> {
        let index = self.bucket_index(&key);
        if let Some(entry) = self.buckets[index].iter_mut().find(|e| e.key == key) {
            return Ok(Some(std::mem::replace(&mut entry.value, value)));
        }

        if self.needs_growth(self.len + 1) {
            self.grow()?;
        }

        let index = self.bucket_index(&key);
        self.buckets[index].push(Entry { key, value });
        self.len += 1;
        Ok(None)
    }

    /// Remove a key, returning its value if it existed
    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        let index = self.bucket_index(key);
        let bucket = &mut self.buckets[index];
        let position = bucket.iter().position(|entry| entry.key == key)?;
        self.len -= 1;
        Some(bucket.swap_remove(position).value)
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over all entries in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Value)> + '_ {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter())
            .map(|entry| (entry.key.as_slice(), &entry.value))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Current live / capacity ratio
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Drop every entry and shrink back to the initial capacity
    pub fn clear(&mut self) {
        self.buckets = empty_buckets(INITIAL_CAPACITY);
        self.len = 0;
    }

    fn bucket_index(&self, key: &[u8]) -> usize {
        let hash = self.hasher.hash_one(key);
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn needs_growth(&self, live: usize) -> bool {
        live * LOAD_DENOMINATOR >= self.capacity() * LOAD_NUMERATOR
    }

    /// Double the bucket array and rehash every entry into it
    fn grow(&mut self) -> Result<()> {
        let new_capacity = self
            .capacity()
            .checked_mul(2)
            .ok_or_else(|| VeroError::StorageFull("bucket count overflow".into()))?;

        let mut buckets: Vec<Vec<Entry>> = Vec::new();
        buckets.try_reserve_exact(new_capacity).map_err(|e| {
            VeroError::StorageFull(format!(
                "cannot allocate {} buckets: {}",
                new_capacity, e
            ))
        })?;
        buckets.resize_with(new_capacity, Vec::new);

        let old = std::mem::replace(&mut self.buckets, buckets);
        for entry in old.into_iter().flatten() {
            let index = self.bucket_index(&entry.key);
            self.buckets[index].push(entry);
        }

        tracing::trace!(capacity = new_capacity, len = self.len, "hash table resized");
        Ok(())
    }
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_buckets(capacity: usize) -> Vec<Vec<Entry>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, Vec::new);
    buckets
}
