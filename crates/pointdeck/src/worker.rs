//! The per-room worker: one task that serializes a client's operations.
//!
//! Commands arrive on an mpsc channel with oneshot replies; store feeds
//! arrive as watch updates. Everything a client does to its room funnels
//! through this single loop, which narrows (but cannot eliminate — other
//! clients write concurrently) the multi-writer race windows.

use std::sync::Arc;

use pointdeck_notify::{Notification, Relay};
use pointdeck_room::{Card, Membership, Participant, ParticipantId, RoomId};
use pointdeck_store::StateStore;
use pointdeck_vote::{CountdownEpoch, CountdownState, ResetState, Voting};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::{ClientConfig, CountdownPhase};

/// Operations the client handle can request.
pub(crate) enum Command {
    Rename { name: String, reply: oneshot::Sender<bool> },
    SelectCard { card: Option<Card>, reply: oneshot::Sender<bool> },
    Reveal { reply: oneshot::Sender<bool> },
    Hide { reply: oneshot::Sender<bool> },
    Reset { reply: oneshot::Sender<bool> },
    StartCountdown { reply: oneshot::Sender<bool> },
    Leave { reply: oneshot::Sender<()> },
}

/// The store feeds the worker consumes.
pub(crate) struct WorkerFeeds {
    pub participants: watch::Receiver<Vec<Participant>>,
    pub revealed: watch::Receiver<bool>,
    pub countdown: watch::Receiver<CountdownState>,
    pub reset: watch::Receiver<ResetState>,
}

/// The feeds the worker publishes to the client handle.
pub(crate) struct WorkerOutputs {
    pub participants: watch::Sender<Vec<Participant>>,
    pub countdown: watch::Sender<CountdownPhase>,
    pub resetting: watch::Sender<bool>,
    pub notifications: broadcast::Sender<Notification>,
}

pub(crate) struct RoomWorker<S: StateStore> {
    room: RoomId,
    user: ParticipantId,
    config: ClientConfig,
    membership: Membership<S>,
    voting: Voting<S>,
    relay: Relay,
    leaving: bool,

    commands: mpsc::Receiver<Command>,
    participants_feed: watch::Receiver<Vec<Participant>>,
    revealed_feed: watch::Receiver<bool>,
    countdown_feed: watch::Receiver<CountdownState>,
    reset_feed: watch::Receiver<ResetState>,

    participants_out: watch::Sender<Vec<Participant>>,
    countdown_out: Arc<watch::Sender<CountdownPhase>>,
    resetting_out: Arc<watch::Sender<bool>>,
    notifications: broadcast::Sender<Notification>,

    presence_task: JoinHandle<()>,
    finalizer_task: JoinHandle<()>,
    ticker: Option<JoinHandle<()>>,
    reset_clear: Option<JoinHandle<()>>,
}

impl<S: StateStore> RoomWorker<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        room: RoomId,
        user: ParticipantId,
        config: ClientConfig,
        membership: Membership<S>,
        voting: Voting<S>,
        commands: mpsc::Receiver<Command>,
        feeds: WorkerFeeds,
        outputs: WorkerOutputs,
        presence_task: JoinHandle<()>,
        finalizer_task: JoinHandle<()>,
    ) -> Self {
        Self {
            room,
            user,
            config,
            membership,
            voting,
            relay: Relay::new(),
            leaving: false,
            commands,
            participants_feed: feeds.participants,
            revealed_feed: feeds.revealed,
            countdown_feed: feeds.countdown,
            reset_feed: feeds.reset,
            participants_out: outputs.participants,
            countdown_out: Arc::new(outputs.countdown),
            resetting_out: Arc::new(outputs.resetting),
            notifications: outputs.notifications,
            presence_task,
            finalizer_task,
            ticker: None,
            reset_clear: None,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::debug!(room = %self.room, participant = %self.user, "room worker started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command).await {
                                break;
                            }
                        }
                        // Every client handle is gone; nothing can reach
                        // this worker anymore.
                        None => break,
                    }
                }
                changed = self.participants_feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_participants();
                }
                changed = self.countdown_feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_countdown();
                }
                changed = self.reset_feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_reset();
                }
            }
        }
        self.teardown();
        tracing::debug!(room = %self.room, participant = %self.user, "room worker stopped");
    }

    /// Handles one command. Returns `true` when the session should end.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Rename { name, reply } => {
                let ok = self.membership.rename(&self.room, &self.user, &name).await;
                let _ = reply.send(ok);
            }
            Command::SelectCard { card, reply } => {
                let ok = self.voting.select_card(&self.room, &self.user, card).await;
                let _ = reply.send(ok);
            }
            Command::Reveal { reply } => {
                let ok = self.voting.set_reveal_state(&self.room, true).await;
                let _ = reply.send(ok);
            }
            Command::Hide { reply } => {
                let ok = self.voting.set_reveal_state(&self.room, false).await;
                let _ = reply.send(ok);
            }
            Command::StartCountdown { reply } => {
                let ok = self.start_countdown().await;
                let _ = reply.send(ok);
            }
            Command::Reset { reply } => {
                let ok = self.reset().await;
                let _ = reply.send(ok);
            }
            Command::Leave { reply } => {
                self.leave().await;
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    /// Countdown entry point. Revealed cards toggle back to hidden; an
    /// already-ticking countdown is left alone; otherwise the countdown
    /// is recorded in the store and the local ticker starts via the feed.
    async fn start_countdown(&mut self) -> bool {
        if *self.revealed_feed.borrow() {
            return self.voting.set_reveal_state(&self.room, false).await;
        }
        if self.ticker_running() {
            return false;
        }
        self.voting
            .start_countdown(&self.room, &self.user)
            .await
            .is_some()
    }

    async fn reset(&mut self) -> bool {
        self.stop_ticker();
        if let Some(stale) = self.reset_clear.take() {
            stale.abort();
        }

        let ok = self.voting.initiate_reset(&self.room, &self.user).await;
        self.voting.end_countdown(&self.room).await;

        let _ = self.resetting_out.send(true);
        // The initiator clears the store-level indicator after the fixed
        // display delay; followers see it via the reset feed.
        let voting = self.voting.clone();
        let room = self.room.clone();
        let delay = self.config.reset_indicator;
        self.reset_clear = Some(tokio::spawn(async move {
            sleep(delay).await;
            voting.clear_reset_state(&room).await;
        }));

        ok
    }

    async fn leave(&mut self) {
        self.leaving = true;
        // Stop the presence task first so a late presence write can't
        // resurrect the room after the removal below.
        self.presence_task.abort();

        let roster = self.participants_feed.borrow().clone();
        let departing_admin = roster
            .iter()
            .any(|p| p.id == self.user && p.is_admin);
        if departing_admin {
            let successor = roster.iter().find(|p| p.id != self.user).map(|p| p.id.clone());
            if let Some(successor) = successor {
                self.membership.transfer_admin(&self.room, &successor).await;
            }
        }
        self.membership.remove_participant(&self.room, &self.user).await;
        tracing::info!(room = %self.room, participant = %self.user, "left room");
    }

    fn on_participants(&mut self) {
        let roster = self.participants_feed.borrow_and_update().clone();
        let events = self.relay.observe(&roster, &self.user, self.leaving);
        for event in events {
            // No subscribers just means nobody is rendering toasts.
            let _ = self.notifications.send(event);
        }
        let _ = self.participants_out.send(roster);
    }

    /// A countdown became active somewhere: run the same local display
    /// timer every client runs. Only the initiator commits at the end,
    /// and only through the epoch guard.
    fn on_countdown(&mut self) {
        let state = self.countdown_feed.borrow_and_update().clone();
        if !state.is_active || self.ticker_running() {
            return;
        }
        let Some(started_at) = state.started_at else {
            return;
        };

        let epoch = CountdownEpoch { room: self.room.clone(), started_at };
        let is_initiator = state.started_by.as_ref() == Some(&self.user);
        let voting = self.voting.clone();
        let display = Arc::clone(&self.countdown_out);
        let ticks = self.config.countdown_ticks;
        let tick_interval = self.config.countdown_tick_interval;
        let reveal_hold = self.config.reveal_hold;

        tracing::debug!(
            room = %self.room,
            initiator = is_initiator,
            "countdown ticker started"
        );
        self.ticker = Some(tokio::spawn(async move {
            for tick in (1..=ticks).rev() {
                let _ = display.send(CountdownPhase::Tick(tick));
                sleep(tick_interval).await;
            }
            let _ = display.send(CountdownPhase::Reveal);
            sleep(reveal_hold).await;
            let _ = display.send(CountdownPhase::Idle);

            if is_initiator {
                voting.finish_countdown(&epoch).await;
            }
        }));
    }

    fn on_reset(&mut self) {
        let state = self.reset_feed.borrow_and_update().clone();
        if state.is_active {
            let initiated_by_me = state.initiated_by.as_ref() == Some(&self.user);
            if !initiated_by_me {
                // A peer reset the round: kill any countdown display and
                // show the indicator. The local fallback timer covers an
                // initiator that dies before clearing the store flag.
                self.stop_ticker();
                if let Some(stale) = self.reset_clear.take() {
                    stale.abort();
                }
                let _ = self.resetting_out.send(true);
                let resetting = Arc::clone(&self.resetting_out);
                let delay = self.config.reset_indicator;
                self.reset_clear = Some(tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = resetting.send(false);
                }));
            }
        } else {
            let _ = self.resetting_out.send(false);
        }
    }

    fn ticker_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let _ = self.countdown_out.send(CountdownPhase::Idle);
    }

    fn teardown(&mut self) {
        self.stop_ticker();
        if let Some(clear) = self.reset_clear.take() {
            clear.abort();
        }
        self.presence_task.abort();
        self.finalizer_task.abort();
        self.relay.reset();
        let _ = self.resetting_out.send(false);
    }
}
