//! Store operations for a voting round.

use chrono::Utc;
use pointdeck_room::{Card, ParticipantId, RoomError, RoomId, paths};
use pointdeck_store::{Fields, StateStore, Value, map_feed};
use serde_json::json;
use tokio::sync::watch;

use crate::{CountdownEpoch, CountdownState, ResetState};

/// Voting operations over the shared tree.
///
/// Cheap to clone; clones share the same store connection.
#[derive(Clone)]
pub struct Voting<S: StateStore> {
    store: S,
}

impl<S: StateStore> Voting<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes (or clears, with `None`) a participant's selected card.
    ///
    /// Unconditional by design: whether selecting is currently sensible
    /// (cards hidden, no countdown running) is the caller's check.
    pub async fn select_card(
        &self,
        room: &RoomId,
        id: &ParticipantId,
        card: Option<Card>,
    ) -> bool {
        let result: Result<(), RoomError> = async {
            let mut fields = Fields::new();
            let value = match card {
                Some(card) => json!(card),
                None => Value::Null,
            };
            fields.insert("selectedCard".into(), value);
            self.store
                .update(&paths::participant(room, id)?, fields)
                .await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(room = %room, participant = %id, error = %e, "card selection failed");
                false
            }
        }
    }

    /// Sets the reveal state: room flag first, then every participant's
    /// `isRevealed`, one write each.
    ///
    /// The two steps are not atomic. A client reading mid-propagation can
    /// see the room revealed while some participants still aren't; the
    /// feeds converge once the pass completes.
    pub async fn set_reveal_state(&self, room: &RoomId, revealed: bool) -> bool {
        let result = self.set_reveal_state_inner(room, revealed).await;
        match result {
            Ok(()) => {
                tracing::info!(room = %room, revealed, "reveal state propagated");
                true
            }
            Err(e) => {
                tracing::warn!(room = %room, revealed, error = %e, "reveal propagation failed");
                false
            }
        }
    }

    async fn set_reveal_state_inner(
        &self,
        room: &RoomId,
        revealed: bool,
    ) -> Result<(), RoomError> {
        let mut fields = Fields::new();
        fields.insert("revealed".into(), json!(revealed));
        self.store.update(&paths::room(room)?, fields).await?;

        for id in self.roster_ids(room).await? {
            let mut fields = Fields::new();
            fields.insert("isRevealed".into(), json!(revealed));
            self.store
                .update(&paths::participant(room, &id)?, fields)
                .await?;
        }
        Ok(())
    }

    /// Clears the round: room flag first, then every participant's card
    /// and reveal flag. Same two-step shape (and the same mid-propagation
    /// visibility) as [`set_reveal_state`](Self::set_reveal_state).
    pub async fn reset_cards(&self, room: &RoomId) -> bool {
        let result = self.reset_cards_inner(room).await;
        match result {
            Ok(()) => {
                tracing::info!(room = %room, "cards reset");
                true
            }
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "card reset failed");
                false
            }
        }
    }

    async fn reset_cards_inner(&self, room: &RoomId) -> Result<(), RoomError> {
        let mut fields = Fields::new();
        fields.insert("revealed".into(), json!(false));
        self.store.update(&paths::room(room)?, fields).await?;

        for id in self.roster_ids(room).await? {
            let mut fields = Fields::new();
            fields.insert("selectedCard".into(), Value::Null);
            fields.insert("isRevealed".into(), json!(false));
            self.store
                .update(&paths::participant(room, &id)?, fields)
                .await?;
        }
        Ok(())
    }

    /// Starts the reset indicator and clears the round.
    ///
    /// The indicator stays on until the initiator calls
    /// [`clear_reset_state`](Self::clear_reset_state) (after its fixed
    /// display delay).
    pub async fn initiate_reset(&self, room: &RoomId, by: &ParticipantId) -> bool {
        let result: Result<(), RoomError> = async {
            let mut fields = Fields::new();
            fields.insert("isResetActive".into(), json!(true));
            fields.insert("resetInitiatedAt".into(), json!(Utc::now().to_rfc3339()));
            fields.insert("resetInitiatedBy".into(), json!(by.as_str()));
            self.store.update(&paths::room(room)?, fields).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => {
                tracing::info!(room = %room, by = %by, "reset initiated");
                self.reset_cards(room).await
            }
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "reset initiation failed");
                false
            }
        }
    }

    /// Clears the reset indicator fields.
    pub async fn clear_reset_state(&self, room: &RoomId) -> bool {
        let result: Result<(), RoomError> = async {
            let mut fields = Fields::new();
            fields.insert("isResetActive".into(), json!(false));
            fields.insert("resetInitiatedAt".into(), Value::Null);
            fields.insert("resetInitiatedBy".into(), Value::Null);
            self.store.update(&paths::room(room)?, fields).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "clearing reset state failed");
                false
            }
        }
    }

    /// Starts a countdown, unless one is already running.
    ///
    /// Returns the new countdown's epoch — the token the initiator's
    /// timer must present to [`finish_countdown`](Self::finish_countdown)
    /// — or `None` when a countdown is already active (or the store
    /// failed).
    pub async fn start_countdown(
        &self,
        room: &RoomId,
        by: &ParticipantId,
    ) -> Option<CountdownEpoch> {
        match self.start_countdown_inner(room, by).await {
            Ok(epoch) => epoch,
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "countdown start failed");
                None
            }
        }
    }

    async fn start_countdown_inner(
        &self,
        room: &RoomId,
        by: &ParticipantId,
    ) -> Result<Option<CountdownEpoch>, RoomError> {
        if self.countdown_state(room).await?.is_active {
            tracing::debug!(room = %room, "countdown already active, not restarting");
            return Ok(None);
        }

        let started_at = Utc::now().to_rfc3339();
        let mut fields = Fields::new();
        fields.insert("isCountdownActive".into(), json!(true));
        fields.insert("countdownStartedAt".into(), json!(started_at));
        fields.insert("countdownStartedBy".into(), json!(by.as_str()));
        self.store.update(&paths::room(room)?, fields).await?;

        tracing::info!(room = %room, by = %by, "countdown started");
        Ok(Some(CountdownEpoch { room: room.clone(), started_at }))
    }

    /// Unconditionally clears the countdown fields (used by reset).
    pub async fn end_countdown(&self, room: &RoomId) -> bool {
        let result: Result<(), RoomError> = async {
            self.store
                .update(&paths::room(room)?, countdown_clear_fields())
                .await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "countdown end failed");
                false
            }
        }
    }

    /// The initiator's terminal commit: ends the countdown and reveals —
    /// but only if `epoch` still names the active countdown. A stale
    /// timer (its countdown was reset or replaced, or its owner already
    /// committed) writes nothing.
    pub async fn finish_countdown(&self, epoch: &CountdownEpoch) -> bool {
        let room = &epoch.room;
        let current = match self.countdown_state(room).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "countdown commit read failed");
                return false;
            }
        };
        if !current.is_active || current.started_at.as_deref() != Some(epoch.started_at.as_str()) {
            tracing::debug!(room = %room, "stale countdown timer, not committing");
            return false;
        }

        self.end_countdown(room).await && self.set_reveal_state(room, true).await
    }

    /// Live feed of the room's countdown fields.
    pub async fn countdown_updates(
        &self,
        room: &RoomId,
    ) -> Result<watch::Receiver<CountdownState>, RoomError> {
        let feed = self.store.subscribe(&paths::room(room)?).await?;
        Ok(map_feed(feed, |node| decode_or_default(node)))
    }

    /// Live feed of the room's reset-indicator fields.
    pub async fn reset_updates(
        &self,
        room: &RoomId,
    ) -> Result<watch::Receiver<ResetState>, RoomError> {
        let feed = self.store.subscribe(&paths::room(room)?).await?;
        Ok(map_feed(feed, |node| decode_or_default(node)))
    }

    async fn countdown_state(&self, room: &RoomId) -> Result<CountdownState, RoomError> {
        let node = self.store.get(&paths::room(room)?).await?;
        Ok(decode_or_default(node.as_ref()))
    }

    async fn roster_ids(&self, room: &RoomId) -> Result<Vec<ParticipantId>, RoomError> {
        let roster = self.store.get(&paths::participants(room)?).await?;
        let Some(map) = roster.as_ref().and_then(Value::as_object) else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::with_capacity(map.len());
        for key in map.keys() {
            match ParticipantId::parse(key) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(key = %key, "skipping malformed participant key"),
            }
        }
        Ok(ids)
    }
}

fn countdown_clear_fields() -> Fields {
    let mut fields = Fields::new();
    fields.insert("isCountdownActive".into(), json!(false));
    fields.insert("countdownStartedAt".into(), Value::Null);
    fields.insert("countdownStartedBy".into(), Value::Null);
    fields
}

/// Decodes the typed view of a room node, falling back to the inactive
/// default when the node is gone or undecodable.
fn decode_or_default<T: serde::de::DeserializeOwned + Default>(node: Option<&Value>) -> T {
    node.and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}
