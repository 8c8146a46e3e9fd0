//! Snapshot Manager
//!
//! Writes and loads the snapshot data file and its manifest.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::{Result, VeroError};
use crate::store::Value;

use super::{decode_entries, encode_entries, SnapshotMeta, META_FILENAME, SNAPSHOT_FILENAME};

/// Summary of a completed snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Entries written
    pub entries: u64,

    /// Size of the data file
    pub bytes: u64,

    /// Manifest stored alongside
    pub meta: SnapshotMeta,

    /// Time spent writing both files
    pub elapsed: Duration,
}

/// A snapshot read back from disk
#[derive(Debug)]
pub struct LoadedSnapshot {
    /// Entries decoded (all of them, or the prefix before a corruption)
    pub entries: Vec<(Vec<u8>, Value)>,

    /// Manifest, present only when it is intact and matches the data file
    pub meta: Option<SnapshotMeta>,

    /// Set when the data file was cut short or malformed
    pub corruption: Option<String>,
}

/// Owns the snapshot files in a data directory
pub struct SnapshotManager {
    dir: PathBuf,
    snapshot_path: PathBuf,
    meta_path: PathBuf,
}

impl SnapshotManager {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            snapshot_path: dir.join(SNAPSHOT_FILENAME),
            meta_path: dir.join(META_FILENAME),
        }
    }

    /// Write `entries` and `meta` with the write-fsync-rename discipline.
    ///
    /// Both files are written and synced under temporary names before either
    /// is renamed into place, so any failure while producing them leaves the
    /// previous snapshot untouched. Failures are reported as `SnapshotIo` and
    /// the temporary files are removed. Only a failed manifest rename can
    /// leave new data beside the old manifest, which `load` then rejects.
    pub fn save(&self, entries: &[(Vec<u8>, Value)], mut meta: SnapshotMeta) -> Result<SnapshotInfo> {
        let started = Instant::now();
        let data_tmp = tmp_path(&self.snapshot_path);
        let meta_tmp = tmp_path(&self.meta_path);
        let temps = [data_tmp.as_path(), meta_tmp.as_path()];

        let (bytes, data_crc) = match write_data_file(&data_tmp, entries) {
            Ok(written) => written,
            Err(e) => return Err(self.abort(&temps, "write snapshot data", e)),
        };

        meta.entry_count = entries.len() as u64;
        meta.data_crc = data_crc;

        let staged = meta
            .serialize()
            .and_then(|body| write_file_synced(&meta_tmp, &body));
        if let Err(e) = staged {
            return Err(self.abort(&temps, "write snapshot manifest", e));
        }

        if let Err(e) = fs::rename(&data_tmp, &self.snapshot_path) {
            return Err(self.abort(&temps, "install snapshot data", e.into()));
        }
        if let Err(e) = fs::rename(&meta_tmp, &self.meta_path) {
            return Err(self.abort(&temps, "install snapshot manifest", e.into()));
        }

        sync_dir(&self.dir);

        Ok(SnapshotInfo {
            entries: meta.entry_count,
            bytes,
            meta,
            elapsed: started.elapsed(),
        })
    }

    /// Load the snapshot, if one exists.
    ///
    /// A truncated or malformed data file yields the records before the damage
    /// and a `corruption` note. The manifest is dropped (with a warning) if it
    /// is missing, fails its CRC, or describes a different data file.
    pub fn load(&self) -> Result<Option<LoadedSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let data = Bytes::from(fs::read(&self.snapshot_path)?);
        let data_crc = crc32fast::hash(&data);
        let decoded = decode_entries(data);

        let meta = if decoded.corruption.is_some() {
            None
        } else {
            self.load_meta(data_crc, decoded.entries.len() as u64)
        };

        Ok(Some(LoadedSnapshot {
            entries: decoded.entries,
            meta,
            corruption: decoded.corruption,
        }))
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    fn load_meta(&self, data_crc: u32, entry_count: u64) -> Option<SnapshotMeta> {
        let bytes = match fs::read(&self.meta_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot manifest unreadable; full log replay");
                return None;
            }
        };

        match SnapshotMeta::deserialize(&bytes) {
            Ok(meta) if meta.data_crc == data_crc && meta.entry_count == entry_count => Some(meta),
            Ok(_) => {
                tracing::warn!("snapshot manifest describes a different snapshot; full log replay");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "snapshot manifest rejected; full log replay");
                None
            }
        }
    }

    fn abort(&self, temps: &[&Path], step: &str, err: VeroError) -> VeroError {
        for tmp in temps {
            let _ = fs::remove_file(tmp);
        }
        VeroError::SnapshotIo(format!("{} in {}: {}", step, self.dir.display(), err))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the data file, returning its size and CRC32
fn write_data_file(path: &Path, entries: &[(Vec<u8>, Value)]) -> Result<(u64, u32)> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(CrcWriter {
        inner: file,
        hasher: crc32fast::Hasher::new(),
    });
    let bytes = encode_entries(&mut writer, entries.iter().map(|(k, v)| (k.as_slice(), v)))?;
    writer.flush()?;

    let crc_writer = writer
        .into_inner()
        .map_err(|e| VeroError::SnapshotIo(format!("flush snapshot: {}", e)))?;
    crc_writer.inner.sync_all()?;

    Ok((bytes, crc_writer.hasher.finalize()))
}

fn write_file_synced(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(body)?;
    file.sync_all()?;
    Ok(())
}

/// fsync the directory so the renames are durable
fn sync_dir(dir: &Path) {
    // Directories cannot be opened for sync outside unix
    if !cfg!(unix) {
        return;
    }
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!(dir = %dir.display(), error = %e, "failed to sync data directory");
    }
}

/// Checksums everything written through it
struct CrcWriter {
    inner: File,
    hasher: crc32fast::Hasher,
}

impl Write for CrcWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
