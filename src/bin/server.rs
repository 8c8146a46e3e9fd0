//! VeroKV Server Binary
//!
//! Recovers state from the data directory and serves clients over TCP.
//! Typing `shutdown` on stdin (or Ctrl+D on a terminal) stops the server
//! gracefully: sessions are closed, the batch queue is drained and a final
//! snapshot is written.

use std::io::{BufRead, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use verokv::network::{Server, ShutdownHandle};
use verokv::{Config, Engine, ReplaySource};

/// VeroKV Server
#[derive(Parser, Debug)]
#[command(name = "verokv-server")]
#[command(about = "Networked key-value store with append log, batch log and snapshots")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./verokv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6381")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Disable the immediate (fsync per write) append log
    #[arg(long)]
    no_append_log: bool,

    /// Disable the batched log
    #[arg(long)]
    no_batch_log: bool,

    /// Log replayed at startup (defaults to the append log when enabled)
    #[arg(long, value_enum)]
    replay: Option<ReplayArg>,

    /// Queue length that forces a batch flush
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Batch flush period in seconds
    #[arg(long, default_value = "10")]
    flush_interval: u64,

    /// Snapshot period in seconds (0 disables periodic snapshots)
    #[arg(long, default_value = "10")]
    snapshot_interval: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReplayArg {
    Aof,
    Batch,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,verokv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("VeroKV Server v{}", verokv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = build_config(&args);

    // Open engine (runs recovery)
    let engine = match Engine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    watch_stdin(server.shutdown_handle());

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn build_config(args: &Args) -> Config {
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .append_log(!args.no_append_log)
        .batch_log(!args.no_batch_log)
        .batch_size(args.batch_size)
        .batch_flush_interval(Duration::from_secs(args.flush_interval))
        .snapshots(args.snapshot_interval > 0)
        .snapshot_interval(Duration::from_secs(args.snapshot_interval.max(1)));

    if let Some(replay) = args.replay {
        builder = builder.replay_source(match replay {
            ReplayArg::Aof => ReplaySource::AppendLog,
            ReplayArg::Batch => ReplaySource::BatchLog,
        });
    }

    builder.build()
}

/// Trigger shutdown when stdin reads `shutdown`, or closes while attached
/// to a terminal. A detached stdin (e.g. `/dev/null`) reaching EOF is ignored.
fn watch_stdin(handle: ShutdownHandle) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let interactive = stdin.is_terminal();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim() == "shutdown" => {
                    tracing::info!("Shutdown requested from stdin");
                    handle.shutdown();
                    return;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        if interactive {
            tracing::info!("Stdin closed; shutting down");
            handle.shutdown();
        }
    });
}
