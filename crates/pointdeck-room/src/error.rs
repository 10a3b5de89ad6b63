//! Error types for the room layer.

use pointdeck_protocol::ProtocolError;
use pointdeck_store::StoreError;

/// Errors that can occur during room and membership operations.
///
/// Only the id-validation and feed-setup paths surface these to callers;
/// every other mutating operation degrades to a logged `false` so the
/// presentation layer never has to unwind mid-session.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The id is not 8 lowercase hex characters. Never persisted; the
    /// caller should redirect to a freshly generated room.
    #[error("invalid room id {0:?}: expected 8 lowercase hex characters")]
    InvalidRoomId(String),

    /// The participant id is empty or unsafe as a store path segment.
    #[error("invalid participant id {0:?}")]
    InvalidParticipantId(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A path or payload could not be built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
