//! Countdown and reset state as stored on the room node.

use pointdeck_room::{ParticipantId, RoomId};
use serde::{Deserialize, Serialize};

/// The countdown fields of a room node.
///
/// Field names are the store's data format; the struct deserializes
/// straight from the room node, ignoring the room's other fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountdownState {
    #[serde(rename = "isCountdownActive", default)]
    pub is_active: bool,
    #[serde(rename = "countdownStartedAt", default)]
    pub started_at: Option<String>,
    #[serde(rename = "countdownStartedBy", default)]
    pub started_by: Option<ParticipantId>,
}

/// The reset-indicator fields of a room node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResetState {
    #[serde(rename = "isResetActive", default)]
    pub is_active: bool,
    #[serde(rename = "resetInitiatedAt", default)]
    pub initiated_at: Option<String>,
    #[serde(rename = "resetInitiatedBy", default)]
    pub initiated_by: Option<ParticipantId>,
}

/// Identifies one particular countdown run: the room plus the timestamp
/// the countdown was started with.
///
/// The initiator's local timer carries its epoch to the commit path; a
/// commit whose epoch no longer matches the room (the countdown was
/// reset, restarted, or already finished) is rejected as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownEpoch {
    pub room: RoomId,
    pub started_at: String,
}
