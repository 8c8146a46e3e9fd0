//! Engine Module
//!
//! The core that coordinates store, logs and snapshots.
//!
//! ## Responsibilities
//! - Recover state on startup: snapshot first, then the log tail after it
//! - Route commands: reads go straight to the store, writes are applied and
//!   then persisted before the reply is released
//! - Capture consistent snapshots together with their log positions
//! - Final drain and snapshot on close

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, ReplaySource};
use crate::error::{Result, VeroError};
use crate::interpreter;
use crate::protocol::{Command, Reply};
use crate::snapshot::{SnapshotInfo, SnapshotManager, SnapshotMeta};
use crate::store::{Store, Value};
use crate::wal::{
    AppendLog, BatchLog, LogRecord, LogRecovery, RecoveryResult, APPEND_LOG_FILENAME,
    BATCH_LOG_FILENAME,
};

/// What startup recovery found
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    /// Entries loaded from the snapshot (0 when there was none)
    pub snapshot_entries: usize,

    /// Why the snapshot was only partially usable, if it was
    pub snapshot_corruption: Option<String>,

    /// Log that was replayed
    pub source: ReplaySource,

    /// Outcome of the log replay
    pub log: RecoveryResult,
}

/// The storage engine
///
/// ## Concurrency Model
///
/// - **Reads** (`get`, `ping`): no engine lock, only the store's read lock
/// - **Writes** (`set`, `del`): serialized by `write_lock`, which is held
///   across store mutation and log append so log order equals apply order
/// - **Snapshots**: take `write_lock` only to drain the batch queue, read
///   both log offsets and copy the table; the file is written after release
///
/// `write_lock` is always taken first. Below it, the store, append log and
/// batch locks are never held together, except batch file → batch queue.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The served key-value table
    store: Arc<Store>,

    /// Immediate durability path
    append_log: Option<Mutex<AppendLog>>,

    /// Batched durability path
    batch_log: Option<BatchLog>,

    /// Snapshot files
    snapshots: SnapshotManager,

    /// Serializes write commands and snapshot capture
    write_lock: Mutex<()>,

    /// Latched after a failed table growth; writes are refused from then on
    storage_full: AtomicBool,

    /// Startup recovery summary
    recovery: RecoveryReport,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Load the snapshot into the store, if any
    /// 3. Replay the selected log from the snapshot's recorded position
    /// 4. Open both log paths for appending
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = Arc::new(Store::new());
        let snapshots = SnapshotManager::new(&config.data_dir);

        // Snapshot
        let (snapshot_entries, snapshot_corruption, meta) = match snapshots.load() {
            Ok(Some(loaded)) => {
                if let Some(reason) = &loaded.corruption {
                    tracing::warn!(reason = %reason, "snapshot damaged; keeping the readable prefix");
                }
                let count = loaded.entries.len();
                store.load(loaded.entries)?;
                (count, loaded.corruption, loaded.meta)
            }
            Ok(None) => (0, None, None),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot unreadable; starting from an empty store");
                (0, Some(e.to_string()), None)
            }
        };

        // Log tail
        let source = config.replay_source;
        let log_path = Self::log_path(&config.data_dir, source);
        let start_offset = match (&meta, source) {
            (Some(meta), ReplaySource::AppendLog) => meta.append_log_offset,
            (Some(meta), ReplaySource::BatchLog) => meta.batch_log_offset,
            (None, _) => 0,
        };

        let log = LogRecovery::replay(&log_path, start_offset, &store)?;
        if log.is_corrupt() {
            Self::quarantine_tail(&log_path, log.valid_len)?;
        }

        tracing::info!(
            snapshot_entries,
            source = ?source,
            start_offset = log.start_offset,
            records_applied = log.records_applied,
            comments_skipped = log.comments_skipped,
            elapsed_ms = log.elapsed.as_millis() as u64,
            keys = store.len(),
            "recovery complete"
        );

        let append_log = if config.append_log_enabled {
            let path = config.data_dir.join(APPEND_LOG_FILENAME);
            Some(Mutex::new(AppendLog::open(&path, config.log_timestamps)?))
        } else {
            None
        };

        let batch_log = if config.batch_log_enabled {
            let path = config.data_dir.join(BATCH_LOG_FILENAME);
            Some(BatchLog::open(&path, config.batch_size)?)
        } else {
            None
        };

        Ok(Self {
            config,
            store,
            append_log,
            batch_log,
            snapshots,
            write_lock: Mutex::new(()),
            storage_full: AtomicBool::new(false),
            recovery: RecoveryReport {
                snapshot_entries,
                snapshot_corruption,
                source,
                log,
            },
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command and produce its reply.
    ///
    /// A write's reply is only released once every enabled durable path that
    /// must hold it has accepted the record; otherwise the reply is replaced
    /// by an error even though the store was already mutated.
    pub fn execute(&self, command: &Command) -> Reply {
        if !command.is_write() {
            return match interpreter::execute(&self.store, command) {
                Ok(reply) => reply,
                Err(e) => Reply::error(e.to_string()),
            };
        }

        if let Err(e) = interpreter::validate(command) {
            return Reply::error(e.to_string());
        }
        if self.is_storage_full() {
            return Reply::error("storage full");
        }

        let _write_guard = self.write_lock.lock();

        let reply = match interpreter::execute(&self.store, command) {
            Ok(reply) => reply,
            Err(e @ VeroError::StorageFull(_)) => {
                self.storage_full.store(true, Ordering::SeqCst);
                tracing::error!(error = %e, "table growth failed; refusing further writes");
                return Reply::error(e.to_string());
            }
            Err(e) => return Reply::error(e.to_string()),
        };

        if let Err(e) = self.persist(command) {
            tracing::error!(
                command = %command.verb.as_str(),
                error = %e,
                "write applied in memory but not persisted"
            );
            return Reply::error(e.to_string());
        }

        reply
    }

    /// Append a write to every enabled log (called with `write_lock` held)
    fn persist(&self, command: &Command) -> Result<()> {
        let record = LogRecord::new(command.clone());

        if let Some(log) = &self.append_log {
            log.lock().append(&record)?;
        }

        if let Some(batch) = &self.batch_log {
            if let Err(e) = batch.enqueue(record) {
                if self.append_log.is_none() {
                    return Err(e);
                }
                // The append log already holds the record durably
                tracing::warn!(error = %e, "eager batch flush failed; records stay queued");
            }
        }

        Ok(())
    }

    /// Get a copy of a value
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.store.get(key)
    }

    /// Drain the batch queue to disk now
    pub fn flush_batch(&self) -> Result<usize> {
        match &self.batch_log {
            Some(batch) => batch.flush(),
            None => Ok(0),
        }
    }

    /// Take a snapshot of the current state.
    ///
    /// The batch queue is drained first so the recorded batch offset covers
    /// every write already reflected in the copied table.
    pub fn snapshot(&self) -> Result<SnapshotInfo> {
        let (entries, meta) = {
            let _write_guard = self.write_lock.lock();

            let batch_offset = match &self.batch_log {
                Some(batch) => {
                    batch.flush()?;
                    batch.offset()
                }
                None => 0,
            };
            let append_offset = self
                .append_log
                .as_ref()
                .map(|log| log.lock().offset())
                .unwrap_or(0);

            (
                self.store.entries(),
                SnapshotMeta::new(append_offset, batch_offset),
            )
        };

        let info = self.snapshots.save(&entries, meta)?;
        tracing::info!(
            entries = info.entries,
            bytes = info.bytes,
            elapsed_ms = info.elapsed.as_millis() as u64,
            "snapshot written"
        );
        Ok(info)
    }

    /// Close the engine gracefully
    ///
    /// Drains the batch queue, syncs the append log and writes a final
    /// snapshot (when snapshots are enabled). Every step is attempted; the
    /// first error is returned.
    pub fn close(&self) -> Result<()> {
        let mut first_error = None;

        match self.flush_batch() {
            Ok(n) if n > 0 => tracing::info!(records = n, "final batch drained"),
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "final batch drain failed");
                first_error.get_or_insert(e);
            }
        }

        if let Some(log) = &self.append_log {
            if let Err(e) = log.lock().sync() {
                tracing::error!(error = %e, "final append log sync failed");
                first_error.get_or_insert(e);
            }
        }

        if self.config.snapshot_enabled {
            if let Err(e) = self.snapshot() {
                tracing::error!(error = %e, "final snapshot failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Keep a copy of a log whose replay hit corruption, then cut the log
    /// back to its valid prefix so new records are not appended after garbage
    fn quarantine_tail(path: &Path, valid_len: u64) -> Result<()> {
        let mut quarantine = path.as_os_str().to_owned();
        quarantine.push(".corrupt");
        let quarantine = PathBuf::from(quarantine);

        fs::copy(path, &quarantine)?;
        fs::OpenOptions::new()
            .write(true)
            .open(path)?
            .set_len(valid_len)?;

        tracing::warn!(
            path = %path.display(),
            valid_len,
            copy = %quarantine.display(),
            "log truncated to last valid record"
        );
        Ok(())
    }

    fn log_path(data_dir: &Path, source: ReplaySource) -> PathBuf {
        match source {
            ReplaySource::AppendLog => data_dir.join(APPEND_LOG_FILENAME),
            ReplaySource::BatchLog => data_dir.join(BATCH_LOG_FILENAME),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Shared handle to the served store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// What startup recovery did
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Whether writes are being refused after a failed table growth
    pub fn is_storage_full(&self) -> bool {
        self.storage_full.load(Ordering::SeqCst)
    }

    /// Records queued for the next batch flush
    pub fn pending_batch(&self) -> usize {
        self.batch_log.as_ref().map(BatchLog::pending).unwrap_or(0)
    }

    /// Current append log offset (0 when the path is disabled)
    pub fn append_log_offset(&self) -> u64 {
        self.append_log
            .as_ref()
            .map(|log| log.lock().offset())
            .unwrap_or(0)
    }

    /// Current batch log offset (0 when the path is disabled)
    pub fn batch_log_offset(&self) -> u64 {
        self.batch_log.as_ref().map(BatchLog::offset).unwrap_or(0)
    }
}
