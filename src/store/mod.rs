//! Store Module
//!
//! The in-memory key → value mapping served to clients.
//!
//! ## Responsibilities
//! - O(1) expected-time get/set/delete
//! - Keep the load factor below `MAX_LOAD_FACTOR` by doubling capacity
//! - Hand out copies of values, never references into the table
//! - Produce a consistent point-in-time iteration for snapshots
//!
//! ## Data Structure Choice
//! Separate chaining over a power-of-two bucket array:
//! - Resize allocates the doubled bucket array up front with `try_reserve`,
//!   so an allocation failure leaves the old table intact
//! - Iteration walks buckets in index order, which is deterministic for a
//!   given table layout
//!
//! ## Concurrency
//! `HashTable` is a plain single-threaded structure. `Store` wraps it in a
//! `parking_lot::RwLock`: mutations and resizes hold the write lock, gets and
//! snapshot scans hold the read lock, so nobody observes a table mid-resize.

mod table;
mod shared;

pub use table::{HashTable, INITIAL_CAPACITY, MAX_LOAD_FACTOR};
pub use shared::Store;

use bytes::Bytes;

/// A value stored under a key.
///
/// Only opaque byte strings exist today; richer types (lists, hashes, sets)
/// would be added as new variants, each with its own snapshot encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Value {
    /// Opaque byte string
    String(Bytes),
}

impl Value {
    /// Raw bytes of a string value
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::String(bytes) => bytes,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::String(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::String(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::String(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Bytes::copy_from_slice(s.as_bytes()))
    }
}
