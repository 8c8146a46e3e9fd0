//! Log Reader
//!
//! Sequential reads of log records starting at a byte offset.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Result, VeroError};

use super::LogRecord;

/// Reads records from a log file
pub struct LogReader {
    reader: BufReader<File>,

    /// Offset just past the last line consumed
    offset: u64,

    /// Comment and blank lines passed over
    comments_skipped: u64,
}

impl LogReader {
    /// Open a log for reading, positioned at `start_offset`
    pub fn open(path: &Path, start_offset: u64) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(start_offset))?;

        Ok(Self {
            reader: BufReader::new(file),
            offset: start_offset,
            comments_skipped: 0,
        })
    }

    /// Read the next record, skipping comments.
    ///
    /// A final line without terminator (torn write) or a line that is not a
    /// valid write command yields `CorruptLogRecord`; `offset()` then still
    /// points at the start of the offending line.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = self.reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                return Ok(None);
            }

            if line.last() != Some(&b'\n') {
                return Err(VeroError::CorruptLogRecord {
                    offset: self.offset,
                    reason: format!("unterminated final line ({} bytes)", read),
                });
            }
            line.pop();

            match LogRecord::parse(&line, self.offset)? {
                Some(record) => {
                    self.offset += read as u64;
                    return Ok(Some(record));
                }
                None => {
                    self.offset += read as u64;
                    self.comments_skipped += 1;
                }
            }
        }
    }

    /// Iterate over the remaining records
    pub fn records(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn comments_skipped(&self) -> u64 {
        self.comments_skipped
    }
}

/// Iterator over log records, fused after the first error
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Cut a torn final line off a log file.
///
/// If the file is non-empty and does not end with `\n`, truncate it to just
/// after the last `\n` (or to empty). Returns the new length when a cut was
/// made. A missing file is left alone.
pub fn repair_tail(path: &Path) -> Result<Option<u64>> {
    const CHUNK: u64 = 4096;

    if !path.exists() {
        return Ok(None);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(None);
    }

    // Scan backwards for the last terminator
    let mut end = len;
    let mut keep = 0;
    let mut chunk = Vec::new();
    while end > 0 {
        let start = end.saturating_sub(CHUNK);
        chunk.resize((end - start) as usize, 0);
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            keep = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    file.set_len(keep)?;
    file.sync_all()?;
    Ok(Some(keep))
}
