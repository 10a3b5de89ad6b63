//! Client configuration.

use std::time::Duration;

use pointdeck_room::MAX_ROOM_PARTICIPANTS;

/// Timing and capacity settings for a [`RoomClient`](crate::RoomClient).
///
/// The countdown values are a protocol constant in disguise: every client
/// replicates the reveal countdown locally, and they only converge
/// because everyone runs the same durations. Override them in tests, not
/// in production deployments.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum participants per room.
    pub max_participants: usize,

    /// Number of numbered countdown ticks ("3, 2, 1").
    pub countdown_ticks: u32,

    /// How long each numbered tick is displayed.
    pub countdown_tick_interval: Duration,

    /// How long the final "Reveal!" tick is held before committing.
    pub reveal_hold: Duration,

    /// How long the "resetting…" indicator stays up before the initiator
    /// clears it.
    pub reset_indicator: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_participants: MAX_ROOM_PARTICIPANTS,
            countdown_ticks: 3,
            countdown_tick_interval: Duration::from_millis(800),
            reveal_hold: Duration::from_millis(500),
            reset_indicator: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default_matches_replicated_timer_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.max_participants, 10);
        assert_eq!(config.countdown_ticks, 3);
        assert_eq!(config.countdown_tick_interval, Duration::from_millis(800));
        assert_eq!(config.reveal_hold, Duration::from_millis(500));
        assert_eq!(config.reset_indicator, Duration::from_secs(1));
    }
}
