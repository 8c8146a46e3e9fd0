//! Snapshot Module
//!
//! Periodic full-state checkpoints that bound recovery time.
//!
//! ## Files
//! ```text
//! {data_dir}/snapshot.dat    entries: [key_len u64 LE][key][value_len u64 LE][value] ...
//! {data_dir}/snapshot.meta   manifest: bincode(SnapshotMeta) + crc32 (4 bytes LE)
//! ```
//! `snapshot.dat` has no header or footer and is read until end-of-file.
//! The manifest records which prefix of each log the snapshot already
//! reflects, plus a CRC of `snapshot.dat`, so recovery replays only the tail.
//!
//! ## Crash Safety
//! Both files are written with the write-fsync-rename pattern:
//! 1. Write `<name>.tmp`
//! 2. fsync the temporary file
//! 3. Atomic rename over the final path
//! 4. fsync the data directory
//!
//! The data file is renamed before the manifest. A crash in between leaves
//! an older manifest whose CRC no longer matches, and recovery falls back to
//! replaying the whole log, which converges to the same state.

mod format;
mod meta;
mod manager;

pub use format::{decode_entries, encode_entries, DecodedEntries};
pub use meta::{SnapshotMeta, META_VERSION};
pub use manager::{LoadedSnapshot, SnapshotInfo, SnapshotManager};

/// File name of the snapshot data file inside the data directory
pub const SNAPSHOT_FILENAME: &str = "snapshot.dat";

/// File name of the snapshot manifest inside the data directory
pub const META_FILENAME: &str = "snapshot.meta";
