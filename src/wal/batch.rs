//! Batch Log
//!
//! The batched durability path. Producers push records onto an in-memory
//! queue; the queue is drained into the batch file by the flush timer, by a
//! producer once the queue reaches `batch_size`, and once more at shutdown.
//!
//! ## Locking
//! - `queue`: held only to push or to take the queued records
//! - `file`: held for a whole drain, so drains never interleave on disk
//! - Order is always `file` → `queue`; producers only ever take `queue`

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, VeroError};

use super::{repair_tail, LogRecord};

struct BatchFile {
    path: PathBuf,
    file: File,
    offset: u64,
}

/// Queue of pending records plus the batch file they drain into
pub struct BatchLog {
    queue: Mutex<VecDeque<LogRecord>>,
    file: Mutex<BatchFile>,
    batch_size: usize,
}

impl BatchLog {
    /// Open or create the batch file
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        if let Some(cut) = repair_tail(path)? {
            tracing::warn!(path = %path.display(), offset = cut, "truncated torn batch log tail");
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            queue: Mutex::new(VecDeque::new()),
            file: Mutex::new(BatchFile {
                path: path.to_path_buf(),
                file,
                offset,
            }),
            batch_size: batch_size.max(1),
        })
    }

    /// Queue a record, draining the queue in place once it holds `batch_size`
    /// records.
    ///
    /// Returns whether this call flushed. The record stays queued if the
    /// eager flush fails.
    pub fn enqueue(&self, record: LogRecord) -> Result<bool> {
        let pending = {
            let mut queue = self.queue.lock();
            queue.push_back(record);
            queue.len()
        };

        if pending >= self.batch_size {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Drain the whole queue to the batch file and fsync it.
    ///
    /// Returns the number of records written. On failure the file is cut back
    /// to its previous length and the records are put back at the front of
    /// the queue, ahead of anything queued meanwhile.
    pub fn flush(&self) -> Result<usize> {
        let mut file = self.file.lock();

        let records: Vec<LogRecord> = self.queue.lock().drain(..).collect();
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::new();
        for record in &records {
            buf.extend_from_slice(&record.encode(false));
        }

        if let Err(e) = write_durably(&mut file.file, &buf) {
            if let Err(cut_err) = file.file.set_len(file.offset) {
                tracing::error!(error = %cut_err, "failed to roll back partial batch write");
            }
            let mut queue = self.queue.lock();
            for record in records.into_iter().rev() {
                queue.push_front(record);
            }
            return Err(VeroError::Persistence(format!(
                "batch flush to {} failed: {}",
                file.path.display(),
                e
            )));
        }

        file.offset += buf.len() as u64;
        tracing::trace!(records = records.len(), offset = file.offset, "batch flushed");
        Ok(records.len())
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Byte length of the flushed prefix of the batch file
    pub fn offset(&self) -> u64 {
        self.file.lock().offset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn path(&self) -> PathBuf {
        self.file.lock().path.clone()
    }
}

fn write_durably(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf)?;
    file.sync_data()
}
