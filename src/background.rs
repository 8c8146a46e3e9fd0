//! Background Tasks
//!
//! Timer threads that run beside client traffic:
//! - batch flusher: drains the batch queue every `batch_flush_interval`
//! - snapshotter: writes a snapshot every `snapshot_interval`
//!
//! Each thread waits on a `crossbeam` ticker and a shutdown channel with
//! `select!`. Dropping the shutdown sender disconnects the channel, which
//! every thread observes at its next wake-up; no thread is ever killed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};

use crate::engine::Engine;
use crate::error::Result;

/// Poll period while waiting for threads to finish during shutdown
const JOIN_POLL: Duration = Duration::from_millis(10);

/// Running background threads
pub struct Background {
    shutdown_tx: Option<Sender<()>>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
    grace: Duration,
}

impl Background {
    /// Spawn the timers enabled in the engine's config
    pub fn start(engine: Arc<Engine>) -> Result<Self> {
        let config = engine.config().clone();
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let mut handles = Vec::new();

        if config.batch_log_enabled {
            let engine = Arc::clone(&engine);
            let handle = spawn_timer(
                "verokv-batch-flush",
                config.batch_flush_interval,
                shutdown_rx.clone(),
                move || match engine.flush_batch() {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(records = n, "batch timer flushed"),
                    Err(e) => tracing::warn!(error = %e, "batch flush failed; retrying next tick"),
                },
            )?;
            handles.push(("batch-flush", handle));
        }

        if config.snapshot_enabled {
            let engine = Arc::clone(&engine);
            let handle = spawn_timer(
                "verokv-snapshot",
                config.snapshot_interval,
                shutdown_rx,
                move || {
                    if let Err(e) = engine.snapshot() {
                        tracing::warn!(error = %e, "snapshot failed; previous snapshot kept");
                    }
                },
            )?;
            handles.push(("snapshot", handle));
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handles,
            grace: config.shutdown_grace,
        })
    }

    /// Number of running timer threads
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every timer to stop and wait up to the grace period for them.
    ///
    /// A thread still busy when the grace period ends (e.g. mid-snapshot on a
    /// slow disk) is detached and reported.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.shutdown_tx.take());

        let deadline = Instant::now() + self.grace;
        for (name, handle) in self.handles.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL);
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    tracing::error!(task = name, "background thread panicked");
                }
            } else {
                tracing::warn!(task = name, "background thread did not stop within grace period");
            }
        }
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.stop();
        }
    }
}

fn spawn_timer<F>(
    name: &str,
    interval: Duration,
    shutdown_rx: Receiver<()>,
    mut on_tick: F,
) -> Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let ticker = channel::tick(interval);
            loop {
                channel::select! {
                    recv(ticker) -> _ => on_tick(),
                    recv(shutdown_rx) -> _ => break,
                }
            }
            tracing::debug!(task = %thread::current().name().unwrap_or("timer"), "background task stopped");
        })?;
    Ok(handle)
}
