//! Error types surfaced by the facade.

use pointdeck_room::RoomId;

/// Why joining a room failed.
///
/// Every variant ends the same way for the presentation layer — redirect
/// to a freshly generated room with an alert — but the taxonomy is kept
/// so the alert can say why.
///
/// Note the documented collapse: a join refused because the room is full
/// and a join that never reached the store both surface as [`RoomFull`]
/// from the membership layer's boolean. Only failures before the join
/// write (room creation, feed setup) report [`StoreUnavailable`].
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The room id is not 8 lowercase hex characters; nothing was
    /// written.
    #[error("invalid room id {0:?}: expected 8 lowercase hex characters")]
    InvalidRoomId(String),

    /// The participant id is unusable as a store key.
    #[error("invalid participant id {0:?}")]
    InvalidParticipantId(String),

    /// The room already holds the maximum number of participants (or the
    /// join write failed in transit — indistinguishable here).
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The store could not be reached while setting the session up.
    #[error("store unavailable")]
    StoreUnavailable,
}
