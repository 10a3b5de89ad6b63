//! `RoomClient`: one client's membership in one room.

use std::fmt;

use pointdeck_notify::Notification;
use pointdeck_room::{Card, Membership, Participant, ParticipantId, Registry, RoomId};
use pointdeck_store::StateStore;
use pointdeck_vote::{Voting, winning_card};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::worker::{Command, RoomWorker, WorkerFeeds, WorkerOutputs};
use crate::{ClientConfig, JoinError};

/// What the countdown display shows right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    /// No countdown running.
    Idle,
    /// A numbered tick ("3", "2", "1").
    Tick(u32),
    /// The final tick before cards flip.
    Reveal,
}

impl fmt::Display for CountdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Tick(n) => write!(f, "{n}"),
            Self::Reveal => f.write_str("Reveal!"),
        }
    }
}

/// Capacity of the notification broadcast. A lagging subscriber loses
/// the oldest toasts, never the stream.
const NOTIFICATION_CAPACITY: usize = 32;

/// One client's live membership in one room.
///
/// All mutating operations are serialized through a per-room worker task;
/// this handle is a thin command sender plus the observable feeds. Cheap
/// to clone.
#[derive(Clone)]
pub struct RoomClient {
    room: RoomId,
    user: ParticipantId,
    commands: mpsc::Sender<Command>,
    participants: watch::Receiver<Vec<Participant>>,
    title: watch::Receiver<String>,
    revealed: watch::Receiver<bool>,
    countdown: watch::Receiver<CountdownPhase>,
    resetting: watch::Receiver<bool>,
    notifications: broadcast::Sender<Notification>,
}

impl RoomClient {
    /// Joins `room_id` as `user_id`/`user_name` with default settings.
    ///
    /// Creates the room if needed, joins, arms presence and the
    /// disconnect finalizer, and starts all live feeds.
    ///
    /// # Errors
    /// [`JoinError::InvalidRoomId`] and [`JoinError::RoomFull`] mean:
    /// generate a fresh id and redirect.
    pub async fn connect<S: StateStore>(
        store: S,
        user_id: &str,
        user_name: &str,
        room_id: &str,
    ) -> Result<Self, JoinError> {
        Self::connect_with_config(store, user_id, user_name, room_id, ClientConfig::default())
            .await
    }

    /// [`connect`](Self::connect) with explicit settings.
    pub async fn connect_with_config<S: StateStore>(
        store: S,
        user_id: &str,
        user_name: &str,
        room_id: &str,
        config: ClientConfig,
    ) -> Result<Self, JoinError> {
        let user = ParticipantId::parse(user_id)
            .map_err(|_| JoinError::InvalidParticipantId(user_id.to_string()))?;
        let room = RoomId::parse(room_id)
            .map_err(|_| JoinError::InvalidRoomId(room_id.to_string()))?;

        let registry = Registry::new(store.clone());
        let membership = Membership::with_capacity(store.clone(), config.max_participants);
        let voting = Voting::new(store.clone());

        if !registry.create_room(&room).await {
            return Err(JoinError::StoreUnavailable);
        }
        if !membership.join(&room, &user, user_name).await {
            return Err(JoinError::RoomFull(room));
        }

        let title = registry
            .title_updates(&room)
            .await
            .map_err(|_| JoinError::StoreUnavailable)?;
        let revealed = registry
            .revealed_updates(&room)
            .await
            .map_err(|_| JoinError::StoreUnavailable)?;
        let participants_feed = membership
            .participants_updates(&room)
            .await
            .map_err(|_| JoinError::StoreUnavailable)?;
        let countdown_feed = voting
            .countdown_updates(&room)
            .await
            .map_err(|_| JoinError::StoreUnavailable)?;
        let reset_feed = voting
            .reset_updates(&room)
            .await
            .map_err(|_| JoinError::StoreUnavailable)?;

        // Feeds are up; nothing below can fail, so the background tasks
        // can't leak out of an aborted connect.
        let presence_task = membership.setup_presence(&room, &user);
        let finalizer_task = membership.watch_disconnects(&room);

        let initial_roster = participants_feed.borrow().clone();
        let (participants_tx, participants) = watch::channel(initial_roster);
        let (countdown_tx, countdown) = watch::channel(CountdownPhase::Idle);
        let (resetting_tx, resetting) = watch::channel(false);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let (commands_tx, commands_rx) = mpsc::channel(16);

        let worker = RoomWorker::new(
            room.clone(),
            user.clone(),
            config,
            membership,
            voting,
            commands_rx,
            WorkerFeeds {
                participants: participants_feed,
                revealed: revealed.clone(),
                countdown: countdown_feed,
                reset: reset_feed,
            },
            WorkerOutputs {
                participants: participants_tx,
                countdown: countdown_tx,
                resetting: resetting_tx,
                notifications: notifications.clone(),
            },
            presence_task,
            finalizer_task,
        );
        tokio::spawn(worker.run());

        tracing::info!(room = %room, participant = %user, "room session started");
        Ok(Self {
            room,
            user,
            commands: commands_tx,
            participants,
            title,
            revealed,
            countdown,
            resetting,
            notifications,
        })
    }

    /// The room this client is in.
    pub fn room_id(&self) -> &RoomId {
        &self.room
    }

    /// This client's participant id.
    pub fn participant_id(&self) -> &ParticipantId {
        &self.user
    }

    /// Live feed of the roster, in store iteration order.
    pub fn participants(&self) -> watch::Receiver<Vec<Participant>> {
        self.participants.clone()
    }

    /// Live feed of the room title.
    pub fn title(&self) -> watch::Receiver<String> {
        self.title.clone()
    }

    /// Live feed of the room-level revealed flag.
    pub fn revealed(&self) -> watch::Receiver<bool> {
        self.revealed.clone()
    }

    /// Live feed of the local countdown display.
    pub fn countdown(&self) -> watch::Receiver<CountdownPhase> {
        self.countdown.clone()
    }

    /// Live feed of the "resetting…" indicator.
    pub fn resetting(&self) -> watch::Receiver<bool> {
        self.resetting.clone()
    }

    /// Opens a fresh notification stream. Each event carries its message
    /// and auto-dismiss duration; dismissal scheduling is the caller's.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// The winning card line for the current feeds, if revealed.
    pub fn winning_card(&self) -> Option<String> {
        let roster = self.participants.borrow();
        let revealed = *self.revealed.borrow();
        winning_card(&roster, revealed)
    }

    /// Whether the local participant currently holds the admin flag.
    pub fn is_admin(&self) -> bool {
        self.participants
            .borrow()
            .iter()
            .find(|p| p.id == self.user)
            .is_some_and(|p| p.is_admin)
    }

    /// Updates this participant's display name.
    pub async fn rename(&self, name: &str) -> bool {
        self.request(|reply| Command::Rename { name: name.to_string(), reply })
            .await
    }

    /// Selects (or clears, with `None`) this participant's card.
    pub async fn select_card(&self, card: Option<Card>) -> bool {
        self.request(|reply| Command::SelectCard { card, reply }).await
    }

    /// Reveals everyone's cards immediately, without a countdown.
    pub async fn reveal(&self) -> bool {
        self.request(|reply| Command::Reveal { reply }).await
    }

    /// Hides everyone's cards again.
    pub async fn hide(&self) -> bool {
        self.request(|reply| Command::Hide { reply }).await
    }

    /// Clears the round: everyone's selection and reveal state.
    pub async fn reset(&self) -> bool {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Starts the replicated countdown. When cards are already revealed
    /// this hides them instead; a countdown already underway is not
    /// restarted.
    pub async fn start_countdown(&self) -> bool {
        self.request(|reply| Command::StartCountdown { reply }).await
    }

    /// Leaves the room: hands the admin flag to the next participant if
    /// needed, removes this participant, and tears the session down.
    pub async fn leave(self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Leave { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn request<F>(&self, command: F) -> bool
    where
        F: FnOnce(oneshot::Sender<bool>) -> Command,
    {
        let (reply, done) = oneshot::channel();
        if self.commands.send(command(reply)).await.is_err() {
            return false;
        }
        done.await.unwrap_or(false)
    }
}
