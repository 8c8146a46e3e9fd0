//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop polling a shutdown flag
//! - One thread per client running a `Session`
//! - Commands routed through `Engine`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, Session, SessionEnd};
