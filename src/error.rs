//! Error types for VeroKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using VeroError
pub type Result<T> = std::result::Result<T, VeroError>;

/// Unified error type for VeroKV operations
#[derive(Debug, Error)]
pub enum VeroError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors (connection-fatal)
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Command Errors (reported to the client, connection continues)
    // -------------------------------------------------------------------------
    #[error("unknown command")]
    UnknownCommand,

    #[error("wrong number of arguments")]
    Arity,

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("storage full: {0}")]
    StorageFull(String),

    // -------------------------------------------------------------------------
    // Durability Errors
    // -------------------------------------------------------------------------
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("Snapshot I/O failure: {0}")]
    SnapshotIo(String),

    #[error("Corrupt log record at byte {offset}: {reason}")]
    CorruptLogRecord { offset: u64, reason: String },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for VeroError {
    fn from(err: bincode::Error) -> Self {
        VeroError::Serialization(err.to_string())
    }
}
