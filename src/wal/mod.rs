//! Durability Log Module
//!
//! Append-only logs of write commands, replayed at startup.
//!
//! ## Responsibilities
//! - Immediate path: append + fsync each write before it is acknowledged
//! - Batch path: queue writes, flush the whole queue on a timer or once it
//!   reaches `batch_size`
//! - Replay a log from a byte offset through the normal command dispatch
//! - Cut torn tails so new appends never extend a half-written line
//!
//! ## File Format
//! ```text
//! set user:1 alice
//! # Timestamp: 1697040000.123456789     (optional, immediate path only)
//! del user:1
//! set counter 42
//! ```
//! One canonical write command per `\n`-terminated line. Lines starting with
//! `#` are informational and skipped on replay. Records are never rewritten
//! in place; a failed append is rolled back by truncating to the last good
//! offset.

mod record;
mod writer;
mod batch;
mod reader;
mod recovery;

pub use record::{LogRecord, COMMENT_PREFIX};
pub use writer::AppendLog;
pub use batch::BatchLog;
pub use reader::{repair_tail, LogReader};
pub use recovery::{LogRecovery, RecoveryResult};

/// File name of the immediate log inside the data directory
pub const APPEND_LOG_FILENAME: &str = "verokv.aof";

/// File name of the batch log inside the data directory
pub const BATCH_LOG_FILENAME: &str = "verokv.batch";
