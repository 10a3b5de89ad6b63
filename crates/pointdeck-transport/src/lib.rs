//! Transport layer for the Pointdeck store protocol.
//!
//! Frames of bytes over WebSocket, nothing more: the [`Listener`] and
//! [`Connection`] traits abstract the socket handling so the store server
//! and client never touch `tokio-tungstenite` directly, and tests can
//! substitute in-memory pipes.

#![allow(async_fn_in_trait)]

mod error;
mod ws;

pub use error::TransportError;
pub use ws::{WsConnection, WsListener, ws_connect};

use std::fmt;

/// Opaque identifier for an accepted or dialed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming connections.
pub trait Listener: Send + 'static {
    /// The connection type produced by this listener.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// The local address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A single connection carrying byte frames in both directions.
///
/// `send` and `recv` may be driven concurrently from different tasks:
/// implementations must not serialize one behind the other.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next frame. `Ok(None)` means the peer closed the
    /// connection cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// This connection's identifier.
    fn id(&self) -> ConnectionId;
}
