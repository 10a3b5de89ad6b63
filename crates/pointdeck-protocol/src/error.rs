//! Error types for the protocol layer.

/// Errors that can occur while naming tree locations or moving messages
/// on and off the wire.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed, truncated, or wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A path (or path segment) violates the tree addressing rules.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}
