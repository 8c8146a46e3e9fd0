//! Append Log Writer
//!
//! The immediate durability path: every record is written and fsynced before
//! `append` returns.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, VeroError};

use super::{repair_tail, LogRecord};

/// Writes records to the immediate log
pub struct AppendLog {
    /// Path to the log file
    path: PathBuf,

    /// File handle opened for appending
    file: File,

    /// Byte length of the durable prefix
    offset: u64,

    /// Emit `# Timestamp:` lines after each record
    timestamps: bool,

    /// Records appended since open
    records_written: u64,

    /// Set when a failed append could not be cut back, so `offset` no longer
    /// matches the file
    poisoned: bool,
}

impl AppendLog {
    /// Open or create the log, cutting any torn final line first
    pub fn open(path: &Path, timestamps: bool) -> Result<Self> {
        if let Some(cut) = repair_tail(path)? {
            tracing::warn!(path = %path.display(), offset = cut, "truncated torn append log tail");
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            timestamps,
            records_written: 0,
            poisoned: false,
        })
    }

    /// Append a record and force it to stable storage.
    ///
    /// Returns the log offset just past the record. On failure the file is
    /// truncated back to the previous offset and `Persistence` is returned.
    /// If that truncation also fails the log refuses every later append.
    pub fn append(&mut self, record: &LogRecord) -> Result<u64> {
        if self.poisoned {
            return Err(VeroError::Persistence(format!(
                "append log {} is unusable after a failed rollback",
                self.path.display()
            )));
        }

        let buf = record.encode(self.timestamps);

        if let Err(e) = self.write_durably(&buf) {
            self.rollback();
            return Err(VeroError::Persistence(format!(
                "append to {} failed: {}",
                self.path.display(),
                e
            )));
        }

        self.offset += buf.len() as u64;
        self.records_written += 1;
        Ok(self.offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Byte offset just past the last durable record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once a partial append could not be rolled back
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn write_durably(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file.write_all(buf)?;
        self.file.sync_data()
    }

    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.offset) {
            self.poisoned = true;
            tracing::error!(
                path = %self.path.display(),
                offset = self.offset,
                error = %e,
                "failed to roll back partial append; refusing further appends"
            );
        }
    }
}
