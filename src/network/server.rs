//! TCP Server
//!
//! Accepts connections and runs one session thread per client.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::background::Background;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{encode_reply, Reply};

use super::Connection;

/// Sleep between accept attempts on the non-blocking listener
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Clonable handle that stops a running server
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting and shut down
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for VeroKV
pub struct Server {
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,

    /// Open client streams, closed on shutdown to unblock their sessions
    clients: Arc<Mutex<HashMap<u64, TcpStream>>>,
    next_client_id: AtomicU64,
}

impl Server {
    /// Bind the listen address from the engine's config
    pub fn bind(engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&engine.config().listen_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            engine,
            listener,
            local_addr,
            shutdown: ShutdownHandle::default(),
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_client_id: AtomicU64::new(0),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until shutdown is requested (blocking)
    ///
    /// Starts the background timers, accepts clients, and on shutdown closes
    /// open sessions, stops the timers, drains the batch queue and writes the
    /// final snapshot before releasing the listening socket.
    pub fn run(self) -> Result<()> {
        let background = Background::start(Arc::clone(&self.engine))?;
        tracing::info!(addr = %self.local_addr, timers = background.len(), "listening");

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        tracing::info!("shutting down");
        self.close_clients();
        background.shutdown();
        let closed = self.engine.close();

        drop(self.listener);
        closed
    }

    fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        let max = self.engine.config().max_connections;
        if self.clients.lock().len() >= max {
            tracing::warn!(peer = %addr, max, "connection limit reached");
            reject(stream, "max connections reached");
            return;
        }

        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(peer = %addr, error = %e, "failed to configure stream");
            return;
        }
        let registered = match stream.try_clone() {
            Ok(clone) => clone,
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "failed to clone stream");
                return;
            }
        };

        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().insert(id, registered);

        let engine = Arc::clone(&self.engine);
        let clients = Arc::clone(&self.clients);
        let spawned = thread::Builder::new()
            .name(format!("verokv-conn-{}", id))
            .spawn(move || {
                match Connection::new(stream, engine) {
                    Ok(mut connection) => {
                        let _ = connection.handle();
                    }
                    Err(e) => tracing::warn!(peer = %addr, error = %e, "failed to set up connection"),
                }
                clients.lock().remove(&id);
            });

        if let Err(e) = spawned {
            tracing::error!(peer = %addr, error = %e, "failed to spawn connection thread");
            if let Some(stream) = self.clients.lock().remove(&id) {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }

    /// Shut down every open client stream and wait for their sessions to end
    fn close_clients(&self) {
        for stream in self.clients.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        let deadline = Instant::now() + self.engine.config().shutdown_grace;
        while !self.clients.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(ACCEPT_POLL);
        }

        let remaining = self.clients.lock().len();
        if remaining > 0 {
            tracing::warn!(remaining, "sessions still running after grace period");
        }
    }
}

fn reject(mut stream: TcpStream, message: &str) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.write_all(&encode_reply(&Reply::error(message)));
    let _ = stream.shutdown(Shutdown::Both);
}
