//! Codec seam: how wire messages become bytes and back.
//!
//! The transport carries opaque byte frames; a codec decides the
//! encoding. [`JsonCodec`] is the only implementation today — the store
//! protocol is low-volume control traffic, and readable frames make
//! debugging across processes painless. A binary codec can be added
//! behind the same trait without touching the store or transport.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to byte frames and decodes them back.
///
/// `Send + Sync + 'static` because a codec is shared by the connection
/// tasks the server spawns.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] when serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] when the frame is malformed or
    /// doesn't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] producing JSON frames via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
