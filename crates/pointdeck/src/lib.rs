//! # Pointdeck
//!
//! A room coordination engine for shared estimation sessions: keeps every
//! connected client's view of a voting round consistent — membership,
//! admin succession, presence-based room lifecycle, and the
//! countdown/reveal/reset state machine — over a shared tree store that
//! offers nothing stronger than last-write-wins keys.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pointdeck::prelude::*;
//!
//! # async fn run() -> Result<(), pointdeck::JoinError> {
//! let store = MemoryStore::new();
//!
//! let alice = RoomClient::connect(store.connect(), "alice", "Alice", "a1b2c3d4").await?;
//! alice.select_card(Some(Card::M)).await;
//! alice.start_countdown().await;
//! // ... after the replicated countdown commits:
//! let winner = alice.winning_card();
//! # Ok(())
//! # }
//! ```
//!
//! Clients in other processes use [`RemoteStore`] against a
//! [`StoreServer`] instead of a [`MemoryStore`] handle; the engine code
//! is identical, which is the point of the [`StateStore`] seam.

mod client;
mod config;
mod error;
mod worker;

pub use client::{CountdownPhase, RoomClient};
pub use config::ClientConfig;
pub use error::JoinError;

pub use pointdeck_notify::{Notification, NotificationKind};
pub use pointdeck_room::{
    Card, MAX_ROOM_PARTICIPANTS, Membership, Participant, ParticipantId, Registry, RoomId,
};
pub use pointdeck_store::{
    MemoryClient, MemoryStore, RemoteStore, StateStore, StoreServer,
};
pub use pointdeck_vote::winning_card;

/// The common imports for building on the engine.
pub mod prelude {
    pub use crate::{
        Card, ClientConfig, CountdownPhase, JoinError, MemoryStore, Notification,
        NotificationKind, Participant, ParticipantId, RemoteStore, RoomClient, RoomId,
        StateStore, StoreServer, winning_card,
    };
}
