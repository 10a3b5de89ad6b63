//! Domain model: room and participant identities, cards, participants.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Length of a room id in hex characters.
const ROOM_ID_LEN: usize = 8;

/// A room identifier: exactly 8 lowercase hex characters.
///
/// Validation happens at construction, so a `RoomId` in hand is always
/// safe to embed in store paths and share links — malformed ids are
/// unrepresentable and therefore never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a raw id.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidRoomId`] unless the input is exactly
    /// 8 lowercase hex characters.
    pub fn parse(raw: &str) -> Result<Self, RoomError> {
        let valid = raw.len() == ROOM_ID_LEN
            && raw.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(RoomError::InvalidRoomId(raw.to_string()))
        }
    }

    /// Generates a fresh random id.
    ///
    /// ~4.3 × 10⁹ possible ids and no reservation step: a collision is
    /// not prevented, it just lands in the existing room (creation is
    /// check-then-create).
    pub fn generate() -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut rng = rand::rng();
        let id: String = (0..ROOM_ID_LEN)
            .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
            .collect();
        Self(id)
    }

    /// The raw 8-character form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// A participant identifier within a room.
///
/// Chosen by the client (typically a UUID); validated here so it is
/// always safe as a store path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validates and wraps a raw id.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidParticipantId`] when the id is empty
    /// or contains characters other than ASCII alphanumerics, `-`, `_`.
    pub fn parse(raw: &str) -> Result<Self, RoomError> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(RoomError::InvalidParticipantId(raw.to_string()))
        }
    }

    /// The raw form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = RoomError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

/// An estimation card: relative sizing tokens plus "no idea".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Card {
    #[serde(rename = "XXS")]
    Xxs,
    #[serde(rename = "XS")]
    Xs,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "M")]
    M,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
    #[serde(rename = "?")]
    Unsure,
}

impl Card {
    /// The full deck, in display order.
    pub const DECK: [Card; 8] = [
        Card::Xxs,
        Card::Xs,
        Card::S,
        Card::M,
        Card::L,
        Card::Xl,
        Card::Xxl,
        Card::Unsure,
    ];

    /// The card's face label (also its stored form).
    pub fn label(&self) -> &'static str {
        match self {
            Card::Xxs => "XXS",
            Card::Xs => "XS",
            Card::S => "S",
            Card::M => "M",
            Card::L => "L",
            Card::Xl => "XL",
            Card::Xxl => "XXL",
            Card::Unsure => "?",
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A joined identity within a room.
///
/// Serialized field names are the store's data format — `selectedCard`
/// is absent (not `null`) while nothing is picked, which is what the
/// store's null-deletes-field update semantics produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_card: Option<Card>,
    #[serde(default)]
    pub is_revealed: bool,
    #[serde(default)]
    pub is_admin: bool,
}

impl Participant {
    /// A fresh participant as written at join time.
    pub fn new(id: ParticipantId, name: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id,
            name: name.into(),
            selected_card: None,
            is_revealed: false,
            is_admin,
        }
    }
}
