//! Snapshot manifest
//!
//! Log positions a snapshot reflects, serialized with bincode and guarded by
//! a CRC32 footer.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeroError};

/// Manifest format version
pub const META_VERSION: u32 = 1;

const CRC_SIZE: usize = 4;

/// Recovery boundary recorded next to a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Format version
    pub version: u32,

    /// Append log bytes already reflected in the snapshot
    pub append_log_offset: u64,

    /// Batch log bytes already reflected in the snapshot
    pub batch_log_offset: u64,

    /// Number of entries in the snapshot
    pub entry_count: u64,

    /// CRC32 of the snapshot data file
    pub data_crc: u32,

    /// Creation time (unix millis)
    pub created_at_ms: u64,
}

impl SnapshotMeta {
    /// Manifest for the given log positions; counts and CRC are filled in on save
    pub fn new(append_log_offset: u64, batch_log_offset: u64) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            version: META_VERSION,
            append_log_offset,
            batch_log_offset,
            entry_count: 0,
            data_crc: 0,
            created_at_ms,
        }
    }

    /// Serialize: bincode body followed by its CRC32 (LE)
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = bincode::serialize(self)?;
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    /// Deserialize and verify the CRC footer and version
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CRC_SIZE {
            return Err(VeroError::CorruptSnapshot(format!(
                "manifest too short: {} bytes",
                bytes.len()
            )));
        }

        let (body, footer) = bytes.split_at(bytes.len() - CRC_SIZE);
        let stored = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(VeroError::CorruptSnapshot(format!(
                "manifest CRC mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            )));
        }

        let meta: SnapshotMeta = bincode::deserialize(body)?;
        if meta.version != META_VERSION {
            return Err(VeroError::CorruptSnapshot(format!(
                "unsupported manifest version {}",
                meta.version
            )));
        }
        Ok(meta)
    }
}
