//! Presence and disconnect cleanup.
//!
//! The store can only apply unconditional writes when a connection ends —
//! it cannot "run a function" server-side. Disconnect cleanup is
//! therefore two-phase:
//!
//! 1. On connection established, the client sets its presence flag and
//!    registers three hooks: remove presence, remove its participant
//!    record, and write a `disconnects/{id}` marker.
//! 2. Every connected client watches the marker collection. Whoever
//!    observes a marker appear finalizes the departure — deletes the room
//!    if it emptied, otherwise restores the single-admin invariant — and
//!    removes the marker.
//!
//! Several peers may run the finalizer for the same marker concurrently;
//! each step is idempotent and converges under last-write-wins.

use chrono::Utc;
use pointdeck_store::{DisconnectAction, StateStore, Value};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{Membership, ParticipantId, RoomError, RoomId, paths};

impl<S: StateStore> Membership<S> {
    /// Establishes presence for a participant and arms the disconnect
    /// hooks, re-arming on every reconnect. Runs until the returned task
    /// is aborted or the connection feed closes.
    pub fn setup_presence(&self, room: &RoomId, id: &ParticipantId) -> JoinHandle<()> {
        let store = self.store().clone();
        let room = room.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let mut connection = store.connection_state();
            loop {
                if *connection.borrow_and_update() {
                    if let Err(e) = establish(&store, &room, &id).await {
                        tracing::warn!(
                            room = %room,
                            participant = %id,
                            error = %e,
                            "presence setup failed"
                        );
                    }
                }
                if connection.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Watches the room's disconnect markers and finalizes departures.
    /// Runs until the returned task is aborted or the feed closes.
    pub fn watch_disconnects(&self, room: &RoomId) -> JoinHandle<()> {
        let membership = self.clone();
        let room = room.clone();
        tokio::spawn(async move {
            let mut feed = match open_marker_feed(&membership, &room).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::warn!(room = %room, error = %e, "disconnect watch failed to start");
                    return;
                }
            };
            loop {
                let marked: Vec<String> = {
                    let value = feed.borrow_and_update();
                    value
                        .as_ref()
                        .and_then(Value::as_object)
                        .map(|m| m.keys().cloned().collect())
                        .unwrap_or_default()
                };
                for key in marked {
                    membership.finalize_departure(&room, &key).await;
                }
                if feed.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn finalize_departure(&self, room: &RoomId, marker_key: &str) {
        tracing::info!(room = %room, participant = marker_key, "finalizing departure");

        // The hooks already removed the participant and presence; either
        // the room emptied, or someone may need the admin flag.
        if !self.registry().delete_if_empty(room).await {
            self.restore_admin(room).await;
        }

        let result: Result<(), RoomError> = async {
            match ParticipantId::parse(marker_key) {
                Ok(id) => {
                    self.store()
                        .remove(&paths::disconnect_marker(room, &id)?)
                        .await?;
                }
                Err(_) => {
                    // Unparseable marker key: clear the whole collection
                    // rather than leave a poison marker forever.
                    self.store().remove(&paths::disconnects(room)?).await?;
                }
            }
            Ok(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(room = %room, error = %e, "marker removal failed");
        }
    }

    /// Re-elects an admin when none remains: the first participant in
    /// iteration order. Every client computes the same choice from the
    /// same snapshot, so concurrent repairs converge.
    async fn restore_admin(&self, room: &RoomId) {
        let roster = match self.snapshot(room).await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "admin repair read failed");
                return;
            }
        };
        if roster.is_empty() || roster.iter().any(|p| p.is_admin) {
            return;
        }
        if let Some(successor) = roster.first() {
            tracing::info!(
                room = %room,
                new_admin = %successor.id,
                "admin succession after disconnect"
            );
            self.transfer_admin(room, &successor.id).await;
        }
    }
}

async fn open_marker_feed<S: StateStore>(
    membership: &Membership<S>,
    room: &RoomId,
) -> Result<tokio::sync::watch::Receiver<Option<Value>>, RoomError> {
    Ok(membership
        .store()
        .subscribe(&paths::disconnects(room)?)
        .await?)
}

async fn establish<S: StateStore>(
    store: &S,
    room: &RoomId,
    id: &ParticipantId,
) -> Result<(), RoomError> {
    store
        .set(&paths::presence_of(room, id)?, json!(true))
        .await?;

    // Hook order matters: presence and participant vanish first, then the
    // marker appears — so a finalizer waking on the marker reads the
    // post-departure roster.
    store
        .on_disconnect(&paths::presence_of(room, id)?, DisconnectAction::Remove)
        .await?;
    store
        .on_disconnect(&paths::participant(room, id)?, DisconnectAction::Remove)
        .await?;
    store
        .on_disconnect(
            &paths::disconnect_marker(room, id)?,
            DisconnectAction::Set { value: json!(Utc::now().to_rfc3339()) },
        )
        .await?;

    tracing::debug!(room = %room, participant = %id, "presence established");
    Ok(())
}
