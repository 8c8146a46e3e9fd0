//! Shared store handle
//!
//! `HashTable` behind a `parking_lot::RwLock`.

use parking_lot::RwLock;

use crate::error::Result;

use super::{HashTable, Value};

/// Thread-safe key-value store
///
/// ## Concurrency:
/// - `set`, `delete`, `clear`, `load`: write lock (resize happens inside `set`)
/// - `get`, `for_each`, `entries`: read lock
/// - All methods use `&self`; share it as `Arc<Store>`
pub struct Store {
    table: RwLock<HashTable>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashTable::new()),
        }
    }

    /// Get a copy of the value stored under `key`
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.table.read().get(key).cloned()
    }

    /// Insert or overwrite `key`
    pub fn set(&self, key: Vec<u8>, value: Value) -> Result<()> {
        self.table.write().insert(key, value)?;
        Ok(())
    }

    /// Remove `key`, returning whether it existed
    pub fn delete(&self, key: &[u8]) -> bool {
        self.table.write().remove(key).is_some()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.table.read().contains_key(key)
    }

    /// Visit every entry while holding the read lock for the whole scan
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&[u8], &Value),
    {
        let table = self.table.read();
        for (key, value) in table.iter() {
            f(key, value);
        }
    }

    /// Copy every entry out, releasing the lock before returning
    pub fn entries(&self) -> Vec<(Vec<u8>, Value)> {
        let table = self.table.read();
        let mut out = Vec::with_capacity(table.len());
        out.extend(table.iter().map(|(k, v)| (k.to_vec(), v.clone())));
        out
    }

    /// Replace the whole content with `entries` under a single write lock
    pub fn load<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, Value)>,
    {
        let mut table = self.table.write();
        table.clear();
        for (key, value) in entries {
            table.insert(key, value)?;
        }
        Ok(())
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.table.write().clear();
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets in the underlying table
    pub fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    /// Current load factor of the underlying table
    pub fn load_factor(&self) -> f64 {
        self.table.read().load_factor()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
