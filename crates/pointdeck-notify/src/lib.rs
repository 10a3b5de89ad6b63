//! Notification relay: turns participant-snapshot transitions into
//! transient UI events.
//!
//! Pure logic, no store access: the facade feeds every roster snapshot
//! through [`Relay::observe`] and broadcasts whatever comes back. The
//! relay owns the diffing rules — who left, who became admin, and when to
//! stay quiet — while dismissal scheduling stays with the presentation
//! layer (each event just carries its auto-dismiss duration).

use std::time::Duration;

use pointdeck_room::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};

/// How long a "user left" toast stays up.
const USER_LEFT_DISMISS: Duration = Duration::from_secs(4);
/// How long the admin-change toasts stay up.
const ADMIN_DISMISS: Duration = Duration::from_secs(3);

/// The kind of transient event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Someone else left the room.
    UserLeft,
    /// Someone else became admin.
    AdminTransferred,
    /// The local user became admin.
    NewAdmin,
}

/// A transient UI event with its display text and auto-dismiss timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub auto_dismiss: Duration,
}

impl Notification {
    fn user_left(name: &str) -> Self {
        Self {
            kind: NotificationKind::UserLeft,
            message: format!("{name} left the room"),
            auto_dismiss: USER_LEFT_DISMISS,
        }
    }

    fn admin_transferred(name: &str) -> Self {
        Self {
            kind: NotificationKind::AdminTransferred,
            message: format!("👑 {name} is now the room admin"),
            auto_dismiss: ADMIN_DISMISS,
        }
    }

    fn new_admin() -> Self {
        Self {
            kind: NotificationKind::NewAdmin,
            message: "🎉 You are now the room admin!".to_string(),
            auto_dismiss: ADMIN_DISMISS,
        }
    }
}

/// Stateful differ for one client's view of one room.
///
/// Keeps the previous snapshot and the admin id it last saw; both are
/// read *before* the new snapshot is applied, so an admin flip is never
/// attributed to the wrong departure.
#[derive(Debug, Default)]
pub struct Relay {
    previous: Vec<Participant>,
    admin_id: Option<ParticipantId>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next roster snapshot; returns the events it implies.
    ///
    /// `local` is the observing user (own departures and promotions are
    /// special-cased); `local_leaving` suppresses admin-change chatter
    /// while the local user is tearing down their own membership.
    pub fn observe(
        &mut self,
        current: &[Participant],
        local: &ParticipantId,
        local_leaving: bool,
    ) -> Vec<Notification> {
        let mut events = Vec::new();

        // Departures first, from the old snapshot.
        let departed: Vec<&Participant> = self
            .previous
            .iter()
            .filter(|prev| !current.iter().any(|c| c.id == prev.id))
            .collect();
        for leaver in &departed {
            if leaver.id != *local {
                events.push(Notification::user_left(&leaver.name));
            }
        }

        // Admin change, judged against the admin id tracked before this
        // snapshot. Quiet while the local user is leaving, and quiet on
        // the very first snapshot (no previous admin to compare).
        let current_admin = current.iter().find(|p| p.is_admin);
        if !local_leaving {
            if let (Some(previous_admin_id), Some(new_admin)) =
                (&self.admin_id, current_admin)
            {
                if new_admin.id != *previous_admin_id {
                    if new_admin.id == *local {
                        events.push(Notification::new_admin());
                    } else {
                        events.push(Notification::admin_transferred(&new_admin.name));
                    }
                }
            }
        }

        self.admin_id = current_admin.map(|p| p.id.clone());
        self.previous = current.to_vec();
        events
    }

    /// Forgets everything (room teardown).
    pub fn reset(&mut self) {
        self.previous.clear();
        self.admin_id = None;
    }
}
