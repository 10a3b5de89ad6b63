//! The voting session: card selection, countdown, reveal, reset.
//!
//! [`Voting`] is a deliberately thin layer over the store. It writes what
//! it's told — enforcement of "no selecting while revealed or counting
//! down" belongs to the caller, because the store can't make that check
//! atomic anyway and pretending otherwise would just hide the race.
//!
//! The one place this layer is strict is the countdown's terminal commit:
//! [`Voting::finish_countdown`] only reveals if the countdown it was
//! started for is still the active one, so a timer surviving its owner's
//! navigation away commits nothing.

mod session;
mod state;
mod winning;

pub use session::Voting;
pub use state::{CountdownEpoch, CountdownState, ResetState};
pub use winning::winning_card;
