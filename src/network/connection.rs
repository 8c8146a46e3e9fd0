//! Connection Handler
//!
//! Runs the read → decode → execute → encode → write loop for one client.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{Result, VeroError};
use crate::protocol::{read_command, write_reply};

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent the terminal verb
    Quit,

    /// Client closed its side of the stream
    PeerClosed,
}

/// Command loop over any buffered byte stream
///
/// Owns nothing beyond the stream halves and a handle to the engine.
pub struct Session<R, W> {
    reader: R,
    writer: W,
    engine: Arc<Engine>,
    max_line_len: usize,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(reader: R, writer: W, engine: Arc<Engine>) -> Self {
        let max_line_len = engine.config().max_line_len;
        Self {
            reader,
            writer,
            engine,
            max_line_len,
        }
    }

    /// Serve commands until quit, end of stream, or an error.
    ///
    /// A protocol error ends the session without a reply; the stream can no
    /// longer be trusted to be aligned on a frame boundary.
    pub fn run(&mut self) -> Result<SessionEnd> {
        loop {
            let command = match read_command(&mut self.reader, self.max_line_len)? {
                Some(command) => command,
                None => return Ok(SessionEnd::PeerClosed),
            };

            tracing::trace!(verb = %command.verb.as_str(), args = command.args.len(), "command");

            let reply = self.engine.execute(&command);
            write_reply(&mut self.writer, &reply)?;

            if command.is_terminal() {
                return Ok(SessionEnd::Quit);
            }
        }
    }
}

/// Handles a single TCP client connection
pub struct Connection {
    session: Session<BufReader<TcpStream>, BufWriter<TcpStream>>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and configures timeouts
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let config = engine.config();
        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let read_stream = stream.try_clone()?;
        let session = Session::new(BufReader::new(read_stream), BufWriter::new(stream), engine);

        Ok(Self { session, peer_addr })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Disconnects and timeouts end the connection quietly; protocol and other
    /// I/O errors are logged and returned.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        match self.session.run() {
            Ok(SessionEnd::Quit) => {
                tracing::debug!("Client {} quit", self.peer_addr);
                Ok(())
            }
            Ok(SessionEnd::PeerClosed) => {
                tracing::debug!("Client {} disconnected", self.peer_addr);
                Ok(())
            }
            Err(VeroError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                Ok(())
            }
            Err(e @ VeroError::Protocol(_)) => {
                tracing::warn!("Closing {} after protocol error: {}", self.peer_addr, e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Error serving {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            // Read timeout (Windows uses TimedOut instead of WouldBlock)
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
