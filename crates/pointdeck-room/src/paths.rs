//! Store path layout for rooms.
//!
//! Everything a room owns lives under `rooms/{id}`:
//!
//! ```text
//! rooms/{id}                      room node (revealed, title, createdAt,
//!                                 countdown/reset fields)
//! rooms/{id}/participants/{pid}   participant records
//! rooms/{id}/presence/{pid}       per-connection liveness flags
//! rooms/{id}/disconnects/{pid}    disconnect markers awaiting a finalizer
//! ```

use pointdeck_protocol::{ProtocolError, StorePath};

use crate::{ParticipantId, RoomId};

/// The collection of all rooms.
pub fn rooms() -> Result<StorePath, ProtocolError> {
    StorePath::parse("rooms")
}

/// The room node itself.
pub fn room(id: &RoomId) -> Result<StorePath, ProtocolError> {
    rooms()?.child(id.as_str())
}

/// The participants collection of a room.
pub fn participants(id: &RoomId) -> Result<StorePath, ProtocolError> {
    room(id)?.child("participants")
}

/// One participant's record.
pub fn participant(id: &RoomId, pid: &ParticipantId) -> Result<StorePath, ProtocolError> {
    participants(id)?.child(pid.as_str())
}

/// The presence collection of a room.
pub fn presence(id: &RoomId) -> Result<StorePath, ProtocolError> {
    room(id)?.child("presence")
}

/// One participant's presence flag.
pub fn presence_of(id: &RoomId, pid: &ParticipantId) -> Result<StorePath, ProtocolError> {
    presence(id)?.child(pid.as_str())
}

/// The disconnect-marker collection of a room.
pub fn disconnects(id: &RoomId) -> Result<StorePath, ProtocolError> {
    room(id)?.child("disconnects")
}

/// One participant's disconnect marker.
pub fn disconnect_marker(
    id: &RoomId,
    pid: &ParticipantId,
) -> Result<StorePath, ProtocolError> {
    disconnects(id)?.child(pid.as_str())
}
