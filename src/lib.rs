//! # VeroKV
//!
//! A small networked key-value store with:
//! - A line-oriented text protocol with RESP-style replies
//! - An immediate append log (fsync before every write is acknowledged)
//! - A batched append log flushed on a timer or when the queue fills
//! - Periodic snapshots that bound recovery to the log tail
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one Session thread per client)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  line → Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        reads: Interpreter → Store                            │
//! │        writes: write_lock { Interpreter → Store → logs }     │
//! └──────┬───────────────────┬───────────────────┬──────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//!  ┌───────────┐      ┌─────────────┐     ┌─────────────┐
//!  │   Store   │      │ Append Log  │     │  Batch Log  │◄── flush timer
//!  │ (RwLock)  │      │  (fsync)    │     │  (queue)    │
//!  └─────┬─────┘      └─────────────┘     └─────────────┘
//!        │
//!        ▼
//!  ┌───────────┐
//!  │ Snapshot  │◄── snapshot timer
//!  └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod interpreter;
pub mod wal;
pub mod snapshot;
pub mod engine;
pub mod background;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VeroError, Result};
pub use config::{Config, ReplaySource};
pub use engine::Engine;
pub use store::{Store, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of VeroKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
