//! Room lifecycle and membership for Pointdeck.
//!
//! Two managers over the shared state tree:
//!
//! - [`Registry`] — room id validation/generation, idempotent creation,
//!   title management, empty-room deletion, and the stale-room sweep.
//! - [`Membership`] — join/leave with capacity enforcement, rename,
//!   admin assignment and succession, the live participant feed, and the
//!   presence/disconnect machinery.
//!
//! Both are thin protocol layers: the store offers last-write-wins keys
//! and nothing else, so the invariants here (one admin per non-empty
//! room, no orphan rooms) are maintained by convention — every client
//! runs the same deterministic repair steps — not by transactions.

mod error;
mod membership;
mod model;
pub mod paths;
mod presence;
mod registry;

pub use error::RoomError;
pub use membership::{MAX_ROOM_PARTICIPANTS, Membership};
pub use model::{Card, Participant, ParticipantId, RoomId};
pub use registry::{DEFAULT_ROOM_TITLE, Registry};
