//! Configuration for VeroKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, VeroError};

/// Main configuration for a VeroKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── verokv.aof       (immediate append log)
    ///     ├── verokv.batch     (batched append log)
    ///     ├── snapshot.dat     (latest snapshot)
    ///     └── snapshot.meta    (log positions covered by the snapshot)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Append + fsync every write before replying
    pub append_log_enabled: bool,

    /// Queue writes and flush them in batches
    pub batch_log_enabled: bool,

    /// Which log file recovery replays
    pub replay_source: ReplaySource,

    /// Queue length that forces an eager batch flush
    pub batch_size: usize,

    /// Period of the batch flush timer
    pub batch_flush_interval: Duration,

    /// Write `# Timestamp:` comment lines after append log records
    pub log_timestamps: bool,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Run the periodic snapshot timer
    pub snapshot_enabled: bool,

    /// Period of the snapshot timer
    pub snapshot_interval: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Longest accepted command frame, terminator included (bytes)
    pub max_line_len: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// How long shutdown waits for background threads to finish
    pub shutdown_grace: Duration,
}

/// Log file replayed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaySource {
    /// The immediate, fsync-per-write log
    AppendLog,

    /// The batched log (may miss the last unflushed batch after a crash)
    BatchLog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./verokv_data"),
            append_log_enabled: true,
            batch_log_enabled: true,
            replay_source: ReplaySource::AppendLog,
            batch_size: 100,
            batch_flush_interval: Duration::from_secs(10),
            log_timestamps: true,
            snapshot_enabled: true,
            snapshot_interval: Duration::from_secs(10),
            listen_addr: "127.0.0.1:6381".to_string(),
            max_connections: 1024,
            max_line_len: 64 * 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the combination of settings is usable
    pub fn validate(&self) -> Result<()> {
        if self.batch_log_enabled && self.batch_size == 0 {
            return Err(VeroError::Config("batch_size must be at least 1".into()));
        }
        if self.batch_log_enabled && self.batch_flush_interval.is_zero() {
            return Err(VeroError::Config(
                "batch_flush_interval must be non-zero".into(),
            ));
        }
        if self.snapshot_enabled && self.snapshot_interval.is_zero() {
            return Err(VeroError::Config(
                "snapshot_interval must be non-zero".into(),
            ));
        }
        if self.max_line_len < 2 {
            return Err(VeroError::Config("max_line_len is too small".into()));
        }
        match self.replay_source {
            ReplaySource::AppendLog if !self.append_log_enabled => Err(VeroError::Config(
                "replay source is the append log but it is disabled".into(),
            )),
            ReplaySource::BatchLog if !self.batch_log_enabled => Err(VeroError::Config(
                "replay source is the batch log but it is disabled".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    replay_source_set: bool,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable the immediate append log
    pub fn append_log(mut self, enabled: bool) -> Self {
        self.config.append_log_enabled = enabled;
        self
    }

    /// Enable or disable the batched log
    pub fn batch_log(mut self, enabled: bool) -> Self {
        self.config.batch_log_enabled = enabled;
        self
    }

    /// Select the log replayed during recovery
    pub fn replay_source(mut self, source: ReplaySource) -> Self {
        self.config.replay_source = source;
        self.replay_source_set = true;
        self
    }

    /// Set the queue length that forces an eager batch flush
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the batch flush timer period
    pub fn batch_flush_interval(mut self, interval: Duration) -> Self {
        self.config.batch_flush_interval = interval;
        self
    }

    /// Toggle timestamp comments in the append log
    pub fn log_timestamps(mut self, enabled: bool) -> Self {
        self.config.log_timestamps = enabled;
        self
    }

    /// Enable or disable periodic snapshots
    pub fn snapshots(mut self, enabled: bool) -> Self {
        self.config.snapshot_enabled = enabled;
        self
    }

    /// Set the snapshot timer period
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.config.snapshot_interval = interval;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the longest accepted command frame (in bytes)
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the shutdown grace period for background threads
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Finish the config.
    ///
    /// Unless a replay source was chosen explicitly, recovery replays the
    /// append log when it is enabled and the batch log otherwise.
    pub fn build(mut self) -> Config {
        if !self.replay_source_set {
            self.config.replay_source = if self.config.append_log_enabled {
                ReplaySource::AppendLog
            } else {
                ReplaySource::BatchLog
            };
        }
        self.config
    }
}
