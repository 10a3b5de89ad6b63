//! Error types for the store layer.

use pointdeck_protocol::ProtocolError;
use pointdeck_transport::TransportError;

/// Errors that can occur on a store connection.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The connection has ended; no further operations are possible.
    #[error("store connection closed")]
    Closed,

    /// The underlying transport failed.
    #[error("store transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A wire message could not be encoded or decoded.
    #[error("store protocol failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// The store acknowledged the request with an error.
    #[error("store rejected request: {0}")]
    Rejected(String),
}
