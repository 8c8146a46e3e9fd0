//! Log Recovery
//!
//! Replays a log into a store through the live command dispatch.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{Result, VeroError};
use crate::interpreter;
use crate::store::Store;

use super::LogReader;

/// Replays logs after a restart
pub struct LogRecovery;

/// Result of a replay
#[derive(Debug, Default, Clone)]
pub struct RecoveryResult {
    /// Offset replay actually started from
    pub start_offset: u64,

    /// Records applied to the store
    pub records_applied: u64,

    /// Comment and blank lines skipped
    pub comments_skipped: u64,

    /// Offset just past the last valid record
    pub valid_len: u64,

    /// Why replay stopped early, if it did
    pub corruption: Option<String>,

    /// Wall-clock replay time
    pub elapsed: Duration,
}

impl RecoveryResult {
    pub fn is_corrupt(&self) -> bool {
        self.corruption.is_some()
    }
}

impl LogRecovery {
    /// Replay `path` into `store` starting at `start_offset`.
    ///
    /// Replies are discarded. A corrupt record stops replay and is reported in
    /// the result rather than as an error; state applied before it stays.
    /// A missing file replays nothing. An offset past the end of the file
    /// means the log was replaced, so replay restarts from the beginning.
    /// An offset at the end of the file replays nothing without reading.
    pub fn replay(path: &Path, start_offset: u64, store: &Store) -> Result<RecoveryResult> {
        let started = Instant::now();

        if !path.exists() {
            return Ok(RecoveryResult {
                start_offset,
                valid_len: 0,
                ..Default::default()
            });
        }

        let file_len = std::fs::metadata(path)?.len();
        let start_offset = if start_offset > file_len {
            tracing::warn!(
                path = %path.display(),
                start_offset,
                file_len,
                "log shorter than recorded position; replaying from the beginning"
            );
            0
        } else {
            start_offset
        };

        // Nothing past the recorded position
        if start_offset == file_len {
            return Ok(RecoveryResult {
                start_offset,
                valid_len: file_len,
                elapsed: started.elapsed(),
                ..Default::default()
            });
        }

        let mut reader = LogReader::open(path, start_offset)?;
        let mut result = RecoveryResult {
            start_offset,
            ..Default::default()
        };

        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    interpreter::execute(store, &record.command)?;
                    result.records_applied += 1;
                }
                Ok(None) => break,
                Err(e @ VeroError::CorruptLogRecord { .. }) => {
                    tracing::warn!(path = %path.display(), error = %e, "log replay stopped at corrupt record");
                    result.corruption = Some(e.to_string());
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        result.valid_len = reader.offset();
        result.comments_skipped = reader.comments_skipped();
        result.elapsed = started.elapsed();
        Ok(result)
    }
}
