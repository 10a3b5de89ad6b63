//! Membership: joins, renames, departures, and admin succession.

use pointdeck_protocol::ProtocolError;
use pointdeck_store::{Fields, StateStore, Value, map_feed};
use serde_json::json;
use tokio::sync::watch;

use crate::{Participant, ParticipantId, Registry, RoomError, RoomId, paths};

/// Maximum number of participants allowed in a room.
pub const MAX_ROOM_PARTICIPANTS: usize = 10;

/// Manages the participant roster of rooms.
///
/// Cheap to clone; clones share the same store connection.
#[derive(Clone)]
pub struct Membership<S: StateStore> {
    store: S,
    registry: Registry<S>,
    capacity: usize,
}

impl<S: StateStore> Membership<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: Registry::new(store.clone()),
            store,
            capacity: MAX_ROOM_PARTICIPANTS,
        }
    }

    /// Overrides the room capacity. Test hook; production rooms hold
    /// [`MAX_ROOM_PARTICIPANTS`].
    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            registry: Registry::new(store.clone()),
            store,
            capacity,
        }
    }

    /// Adds a participant to a room, or refreshes their name if they are
    /// already in it.
    ///
    /// Returns `false` when the room already holds the maximum number of
    /// distinct participants — and also when the store fails, which a
    /// caller cannot tell apart (both end in "regenerate an id and
    /// redirect", so the distinction is deliberately not surfaced).
    ///
    /// The admin flag is computed from the participant count read
    /// immediately before the insert: the first joiner becomes admin.
    /// Two clients joining an empty room at once can therefore both read
    /// zero and both become admin; the disconnect finalizer and the
    /// snapshot-diff path repair this after the fact.
    pub async fn join(&self, room: &RoomId, id: &ParticipantId, name: &str) -> bool {
        match self.join_inner(room, id, name).await {
            Ok(joined) => joined,
            Err(e) => {
                tracing::warn!(room = %room, participant = %id, error = %e, "join failed");
                false
            }
        }
    }

    async fn join_inner(
        &self,
        room: &RoomId,
        id: &ParticipantId,
        name: &str,
    ) -> Result<bool, RoomError> {
        let record = paths::participant(room, id)?;

        // Re-join: keep card, reveal, and admin state; refresh the name.
        if self.store.get(&record).await?.is_some() {
            let mut fields = Fields::new();
            fields.insert("name".into(), json!(name));
            self.store.update(&record, fields).await?;
            tracing::info!(room = %room, participant = %id, "participant re-joined");
            return Ok(true);
        }

        let roster = self.store.get(&paths::participants(room)?).await?;
        let count = roster
            .as_ref()
            .and_then(Value::as_object)
            .map_or(0, |m| m.len());
        if count >= self.capacity {
            tracing::warn!(room = %room, participant = %id, count, "room is full");
            return Ok(false);
        }

        let participant = Participant::new(id.clone(), name, count == 0);
        let value = serde_json::to_value(&participant).map_err(ProtocolError::Encode)?;
        self.store.set(&record, value).await?;
        tracing::info!(
            room = %room,
            participant = %id,
            admin = participant.is_admin,
            "participant joined"
        );
        Ok(true)
    }

    /// Updates a participant's display name, nothing else.
    pub async fn rename(&self, room: &RoomId, id: &ParticipantId, name: &str) -> bool {
        let result: Result<(), RoomError> = async {
            let mut fields = Fields::new();
            fields.insert("name".into(), json!(name));
            self.store
                .update(&paths::participant(room, id)?, fields)
                .await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(room = %room, participant = %id, error = %e, "rename failed");
                false
            }
        }
    }

    /// Removes a participant and their presence flag, then deletes the
    /// room if that left it empty.
    pub async fn remove_participant(&self, room: &RoomId, id: &ParticipantId) -> bool {
        let result: Result<(), RoomError> = async {
            self.store.remove(&paths::participant(room, id)?).await?;
            self.store.remove(&paths::presence_of(room, id)?).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => {
                tracing::info!(room = %room, participant = %id, "participant removed");
                self.registry.delete_if_empty(room).await;
                true
            }
            Err(e) => {
                tracing::warn!(room = %room, participant = %id, error = %e, "removal failed");
                false
            }
        }
    }

    /// Reads the current roster, in store iteration order (lexicographic
    /// by participant id — the order every client sees).
    pub async fn snapshot(&self, room: &RoomId) -> Result<Vec<Participant>, RoomError> {
        let roster = self.store.get(&paths::participants(room)?).await?;
        Ok(parse_roster(roster.as_ref()))
    }

    /// Live feed of the roster.
    pub async fn participants_updates(
        &self,
        room: &RoomId,
    ) -> Result<watch::Receiver<Vec<Participant>>, RoomError> {
        let feed = self.store.subscribe(&paths::participants(room)?).await?;
        Ok(map_feed(feed, |roster| parse_roster(roster)))
    }

    /// Moves the admin flag to `new_admin` in one merged update: every
    /// current participant's flag is cleared and the target's set in a
    /// single store write, so no observer sees an intermediate roster
    /// with no admin at all.
    ///
    /// Returns `false` without writing when the target is not in the
    /// room.
    pub async fn transfer_admin(&self, room: &RoomId, new_admin: &ParticipantId) -> bool {
        match self.transfer_admin_inner(room, new_admin).await {
            Ok(transferred) => transferred,
            Err(e) => {
                tracing::warn!(
                    room = %room,
                    new_admin = %new_admin,
                    error = %e,
                    "admin transfer failed"
                );
                false
            }
        }
    }

    async fn transfer_admin_inner(
        &self,
        room: &RoomId,
        new_admin: &ParticipantId,
    ) -> Result<bool, RoomError> {
        let roster = self.store.get(&paths::participants(room)?).await?;
        let Some(roster) = roster.as_ref().and_then(Value::as_object) else {
            return Ok(false);
        };
        if !roster.contains_key(new_admin.as_str()) {
            return Ok(false);
        }

        let mut fields = Fields::new();
        for id in roster.keys() {
            fields.insert(format!("{id}/isAdmin"), json!(false));
        }
        fields.insert(format!("{new_admin}/isAdmin"), json!(true));
        self.store
            .update(&paths::participants(room)?, fields)
            .await?;
        tracing::info!(room = %room, new_admin = %new_admin, "admin role transferred");
        Ok(true)
    }

    /// The first participant in iteration order that isn't `excluding` —
    /// the deterministic successor every client agrees on.
    pub async fn find_next_admin(
        &self,
        room: &RoomId,
        excluding: &ParticipantId,
    ) -> Option<ParticipantId> {
        match self.snapshot(room).await {
            Ok(roster) => roster
                .into_iter()
                .map(|p| p.id)
                .find(|id| id != excluding),
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "next-admin lookup failed");
                None
            }
        }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn registry(&self) -> &Registry<S> {
        &self.registry
    }
}

/// Decodes a roster node into participants, skipping records that fail
/// to parse (a half-written record from a crashing peer shouldn't take
/// the whole feed down).
fn parse_roster(roster: Option<&Value>) -> Vec<Participant> {
    let Some(map) = roster.and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut participants = Vec::with_capacity(map.len());
    for (key, value) in map {
        match serde_json::from_value::<Participant>(value.clone()) {
            Ok(p) => participants.push(p),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping undecodable participant");
            }
        }
    }
    participants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster_none_is_empty() {
        assert!(parse_roster(None).is_empty());
    }

    #[test]
    fn test_parse_roster_keeps_store_key_order() {
        let roster = json!({
            "b-user": { "id": "b-user", "name": "Bo" },
            "a-user": { "id": "a-user", "name": "Al" },
        });
        let parsed = parse_roster(Some(&roster));
        let ids: Vec<&str> = parsed.iter().map(|p| p.id.as_str()).collect();
        // serde_json object keys iterate sorted, which is the iteration
        // order admin succession relies on.
        assert_eq!(ids, ["a-user", "b-user"]);
    }

    #[test]
    fn test_parse_roster_skips_undecodable_records() {
        let roster = json!({
            "u1": { "id": "u1", "name": "Al" },
            "u2": "not a participant",
        });
        let parsed = parse_roster(Some(&roster));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id.as_str(), "u1");
    }
}
