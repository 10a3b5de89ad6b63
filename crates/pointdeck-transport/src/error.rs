//! Error types for the transport layer.

use tokio_tungstenite::tungstenite;

/// Errors that can occur while listening, dialing, or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener socket failed.
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    /// The WebSocket handshake on an accepted socket failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(tungstenite::Error),

    /// Dialing a remote server failed.
    #[error("connect failed: {0}")]
    Connect(tungstenite::Error),

    /// Sending a frame failed; the connection is unusable.
    #[error("send failed: {0}")]
    Send(tungstenite::Error),

    /// Receiving a frame failed; the connection is unusable.
    #[error("receive failed: {0}")]
    Receive(tungstenite::Error),
}
