//! Room registry: creation, titles, deletion, and the stale-room sweep.

use chrono::Utc;
use pointdeck_store::{StateStore, map_feed};
use serde_json::{Value, json};
use tokio::sync::watch;

use crate::{RoomError, RoomId, paths};

/// The title a room carries until someone renames it.
pub const DEFAULT_ROOM_TITLE: &str = "Sprint Planning Poker";

/// Manages room nodes in the shared tree.
///
/// Cheap to clone; clones share the same store connection.
#[derive(Clone)]
pub struct Registry<S: StateStore> {
    store: S,
}

impl<S: StateStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Generates a fresh room id. No reservation — a collision simply
    /// lands in the existing room on create.
    pub fn generate_id(&self) -> RoomId {
        RoomId::generate()
    }

    /// Creates the room if it doesn't exist yet. Idempotent: an existing
    /// room (including one created concurrently) is success.
    ///
    /// Malformed ids never reach this point — [`RoomId`] can only hold a
    /// validated id, so rejection happens at the parse boundary.
    pub async fn create_room(&self, id: &RoomId) -> bool {
        match self.create_room_inner(id).await {
            Ok(created) => {
                if created {
                    tracing::info!(room = %id, "room created");
                }
                true
            }
            Err(e) => {
                tracing::warn!(room = %id, error = %e, "room creation failed");
                false
            }
        }
    }

    async fn create_room_inner(&self, id: &RoomId) -> Result<bool, RoomError> {
        let path = paths::room(id)?;
        if self.store.get(&path).await?.is_some() {
            return Ok(false);
        }
        // Check-then-create: two clients racing here both write the same
        // initial node, so last-write-wins converges to the same state.
        self.store
            .set(
                &path,
                json!({
                    "revealed": false,
                    "createdAt": Utc::now().to_rfc3339(),
                    "title": DEFAULT_ROOM_TITLE,
                }),
            )
            .await?;
        Ok(true)
    }

    /// Writes a new room title.
    pub async fn set_title(&self, id: &RoomId, title: &str) -> bool {
        match self.set_title_inner(id, title).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(room = %id, error = %e, "title update failed");
                false
            }
        }
    }

    async fn set_title_inner(&self, id: &RoomId, title: &str) -> Result<(), RoomError> {
        let mut fields = pointdeck_store::Fields::new();
        fields.insert("title".into(), json!(title));
        self.store.update(&paths::room(id)?, fields).await?;
        Ok(())
    }

    /// Live feed of the room's title. Holds [`DEFAULT_ROOM_TITLE`] while
    /// the room doesn't exist or carries none.
    pub async fn title_updates(
        &self,
        id: &RoomId,
    ) -> Result<watch::Receiver<String>, RoomError> {
        let feed = self.store.subscribe(&paths::room(id)?).await?;
        Ok(map_feed(feed, |room| {
            room.and_then(|r| r.get("title"))
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_ROOM_TITLE)
                .to_string()
        }))
    }

    /// Live feed of the room-level revealed flag.
    pub async fn revealed_updates(
        &self,
        id: &RoomId,
    ) -> Result<watch::Receiver<bool>, RoomError> {
        let feed = self.store.subscribe(&paths::room(id)?).await?;
        Ok(map_feed(feed, |room| {
            room.and_then(|r| r.get("revealed"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        }))
    }

    /// Deletes the room and everything under it.
    pub async fn delete_room(&self, id: &RoomId) -> bool {
        match self.delete_room_inner(id).await {
            Ok(()) => {
                tracing::info!(room = %id, "room deleted");
                true
            }
            Err(e) => {
                tracing::warn!(room = %id, error = %e, "room deletion failed");
                false
            }
        }
    }

    async fn delete_room_inner(&self, id: &RoomId) -> Result<(), RoomError> {
        self.store.remove(&paths::room(id)?).await?;
        Ok(())
    }

    /// Deletes the room when it has neither participants nor presence
    /// flags. Returns whether a deletion happened.
    pub async fn delete_if_empty(&self, id: &RoomId) -> bool {
        match self.is_room_empty(id).await {
            Ok(true) => self.delete_room(id).await,
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(room = %id, error = %e, "empty-room check failed");
                false
            }
        }
    }

    async fn is_room_empty(&self, id: &RoomId) -> Result<bool, RoomError> {
        let has_participants = self
            .store
            .get(&paths::participants(id)?)
            .await?
            .as_ref()
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty());
        let has_presence = self
            .store
            .get(&paths::presence(id)?)
            .await?
            .as_ref()
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty());
        Ok(!has_participants && !has_presence)
    }

    /// Sweeps every room: deletes the empty ones, and clears leftover
    /// disconnect markers on rooms that turn out to be live (a finalizer
    /// that never ran because its peers all vanished at once).
    ///
    /// Returns the number of rooms deleted.
    pub async fn sweep_stale(&self) -> usize {
        let ids = match self.all_room_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "stale-room sweep failed to enumerate");
                return 0;
            }
        };

        let mut deleted = 0;
        for id in ids {
            if self.delete_if_empty(&id).await {
                deleted += 1;
            } else {
                self.clear_stale_markers(&id).await;
            }
        }
        if deleted > 0 {
            tracing::info!(deleted, "stale-room sweep finished");
        }
        deleted
    }

    async fn all_room_ids(&self) -> Result<Vec<RoomId>, RoomError> {
        let Some(rooms) = self.store.get(&paths::rooms()?).await? else {
            return Ok(Vec::new());
        };
        let Some(map) = rooms.as_object() else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::with_capacity(map.len());
        for key in map.keys() {
            match RoomId::parse(key) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    tracing::warn!(key = %key, "skipping room with malformed id");
                }
            }
        }
        Ok(ids)
    }

    async fn clear_stale_markers(&self, id: &RoomId) {
        let result: Result<(), RoomError> = async {
            let path = paths::disconnects(id)?;
            if self.store.get(&path).await?.is_some() {
                self.store.remove(&path).await?;
                tracing::debug!(room = %id, "cleared stale disconnect markers");
            }
            Ok(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(room = %id, error = %e, "clearing stale markers failed");
        }
    }
}
