//! Log record definitions
//!
//! Text form of one write command.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, VeroError};
use crate::interpreter;
use crate::protocol::{decode_command, Command};

/// Lines starting with this byte are comments
pub const COMMENT_PREFIX: u8 = b'#';

/// A single write command as persisted in a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// The write command to replay
    pub command: Command,

    /// When the record was created (unknown for records read back from disk)
    pub timestamp: Option<SystemTime>,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(command: Command) -> Self {
        Self {
            command,
            timestamp: Some(SystemTime::now()),
        }
    }

    /// Serialize as `\n`-terminated text.
    ///
    /// With `with_timestamp`, a `# Timestamp: <secs>.<nanos>` comment line
    /// follows the record.
    pub fn encode(&self, with_timestamp: bool) -> Vec<u8> {
        let mut buf = self.command.to_line();
        buf.push(b'\n');

        if with_timestamp {
            if let Some(since_epoch) = self
                .timestamp
                .and_then(|ts| ts.duration_since(UNIX_EPOCH).ok())
            {
                buf.extend_from_slice(
                    format!(
                        "{} Timestamp: {}.{:09}\n",
                        COMMENT_PREFIX as char,
                        since_epoch.as_secs(),
                        since_epoch.subsec_nanos()
                    )
                    .as_bytes(),
                );
            }
        }
        buf
    }

    /// Parse one log line (terminator stripped) found at byte `offset`.
    ///
    /// Returns `Ok(None)` for comments and blank lines. Anything that is not a
    /// well-formed write command is a `CorruptLogRecord`.
    pub fn parse(line: &[u8], offset: u64) -> Result<Option<LogRecord>> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&COMMENT_PREFIX) || line.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let command = decode_command(line);
        let corrupt = |reason: String| VeroError::CorruptLogRecord { offset, reason };

        if !command.is_write() {
            return Err(corrupt(format!(
                "not a write command: {:?}",
                command.verb.as_str()
            )));
        }
        interpreter::validate(&command).map_err(|e| corrupt(e.to_string()))?;

        Ok(Some(LogRecord {
            command,
            timestamp: None,
        }))
    }
}
