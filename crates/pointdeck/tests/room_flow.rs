//! End-to-end session tests: several clients on one shared store walking
//! through full voting rounds, admin hand-offs, and disconnects.
//!
//! Timer-driven behavior runs with shortened configured durations; the
//! assertions poll for the settled state rather than racing exact ticks.

use std::time::Duration;

use pointdeck::prelude::*;
use pointdeck::{Membership, NotificationKind};
use pointdeck_store::MemoryStore;

/// Countdown and reset timings shrunk for tests.
fn fast_config() -> ClientConfig {
    ClientConfig {
        countdown_tick_interval: Duration::from_millis(20),
        reveal_hold: Duration::from_millis(20),
        reset_indicator: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

/// Polls `check` until it passes or the deadline expires.
async fn eventually<F>(mut check: F, what: &str)
where
    F: AsyncFnMut() -> bool,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline: {what}");
}

/// Collects notifications of `kind` from a broadcast receiver until one
/// arrives or the deadline expires.
async fn expect_notification(
    rx: &mut tokio::sync::broadcast::Receiver<Notification>,
    kind: NotificationKind,
) -> Notification {
    let deadline = tokio::time::sleep(Duration::from_secs(2));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) if event.kind == kind => return event,
                    Ok(_) => continue,
                    Err(e) => panic!("notification stream ended: {e}"),
                }
            }
            () = &mut deadline => panic!("no {kind:?} notification within deadline"),
        }
    }
}

#[tokio::test]
async fn test_connect_rejects_malformed_room_id() {
    let store = MemoryStore::new();
    let result = RoomClient::connect(store.connect(), "alice", "Alice", "NOT-HEX!").await;
    assert!(matches!(result, Err(JoinError::InvalidRoomId(_))));

    // Nothing may have been persisted for the bad id.
    let probe = store.connect();
    let rooms = probe
        .get(&pointdeck_store::StorePath::parse("rooms").expect("path"))
        .await
        .expect("get");
    assert_eq!(rooms, None);
}

#[tokio::test]
async fn test_connect_rejects_eleventh_participant() {
    let store = MemoryStore::new();
    let filler = Membership::new(store.connect());
    let room = RoomId::parse("a1b2c3d4").expect("valid");
    for n in 0..10 {
        let id = ParticipantId::parse(&format!("user-{n:02}")).expect("valid");
        assert!(filler.join(&room, &id, &format!("User {n}")).await);
    }

    let result = RoomClient::connect(store.connect(), "latecomer", "Late", "a1b2c3d4").await;
    assert!(matches!(result, Err(JoinError::RoomFull(_))));
}

#[tokio::test]
async fn test_full_round_countdown_reveal_winning_card_reset() {
    let store = MemoryStore::new();

    let alice = RoomClient::connect_with_config(
        store.connect(),
        "alice",
        "Alice",
        "a1b2c3d4",
        fast_config(),
    )
    .await
    .expect("alice joins");
    let bob = RoomClient::connect_with_config(
        store.connect(),
        "bob",
        "Bob",
        "a1b2c3d4",
        fast_config(),
    )
    .await
    .expect("bob joins");

    // First joiner is admin, second is not.
    eventually(
        async || {
            let roster = alice.participants().borrow().clone();
            roster.len() == 2
        },
        "both participants visible",
    )
    .await;
    assert!(alice.is_admin());
    assert!(!bob.is_admin());

    assert!(alice.select_card(Some(Card::M)).await);
    assert!(bob.select_card(Some(Card::S)).await);

    // Alice initiates; the replicated timers run on both clients and
    // only Alice's commits the reveal.
    assert!(alice.start_countdown().await);
    eventually(
        async || *alice.revealed().borrow() && *bob.revealed().borrow(),
        "countdown commits the reveal on every client",
    )
    .await;
    eventually(
        async || {
            let roster = bob.participants().borrow().clone();
            roster.len() == 2 && roster.iter().all(|p| p.is_revealed)
        },
        "per-participant reveal flags settle",
    )
    .await;

    assert_eq!(alice.winning_card().as_deref(), Some("M / S (1 vote each)"));
    assert_eq!(bob.winning_card().as_deref(), Some("M / S (1 vote each)"));

    // Reset clears everything for everyone within the indicator window.
    assert!(alice.reset().await);
    eventually(
        async || {
            let roster = bob.participants().borrow().clone();
            !roster.is_empty()
                && roster.iter().all(|p| p.selected_card.is_none() && !p.is_revealed)
                && !*bob.revealed().borrow()
        },
        "reset settles on every client",
    )
    .await;
    // The indicator comes back down once the initiator clears it.
    eventually(
        async || !*bob.resetting().borrow() && !*alice.resetting().borrow(),
        "reset indicator cleared",
    )
    .await;
    assert_eq!(alice.winning_card(), None);
}

#[tokio::test]
async fn test_follower_replicates_countdown_display() {
    let store = MemoryStore::new();
    let alice = RoomClient::connect_with_config(
        store.connect(),
        "alice",
        "Alice",
        "00c0ffee",
        fast_config(),
    )
    .await
    .expect("alice joins");
    let bob = RoomClient::connect_with_config(
        store.connect(),
        "bob",
        "Bob",
        "00c0ffee",
        fast_config(),
    )
    .await
    .expect("bob joins");

    let mut display = bob.countdown();
    assert_eq!(*display.borrow_and_update(), CountdownPhase::Idle);

    assert!(alice.start_countdown().await);

    // Bob's ticker starts from the store feed, not from Alice's client.
    eventually(
        async || *bob.countdown().borrow() != CountdownPhase::Idle,
        "follower ticker starts",
    )
    .await;
    eventually(
        async || *bob.countdown().borrow() == CountdownPhase::Idle && *bob.revealed().borrow(),
        "follower ticker ends and reveal lands",
    )
    .await;
}

#[tokio::test]
async fn test_second_countdown_cannot_start_while_one_runs() {
    let store = MemoryStore::new();
    let alice = RoomClient::connect_with_config(
        store.connect(),
        "alice",
        "Alice",
        "0abc1234",
        fast_config(),
    )
    .await
    .expect("alice joins");
    let bob = RoomClient::connect_with_config(
        store.connect(),
        "bob",
        "Bob",
        "0abc1234",
        fast_config(),
    )
    .await
    .expect("bob joins");

    assert!(alice.start_countdown().await);
    eventually(
        async || *bob.countdown().borrow() != CountdownPhase::Idle,
        "countdown visible to bob",
    )
    .await;
    assert!(!bob.start_countdown().await, "second countdown refused");
}

#[tokio::test]
async fn test_admin_leave_hands_flag_to_next_participant() {
    let store = MemoryStore::new();
    let alice = RoomClient::connect(store.connect(), "alice", "Alice", "feedc0de")
        .await
        .expect("alice joins");
    let bob = RoomClient::connect(store.connect(), "bob", "Bob", "feedc0de")
        .await
        .expect("bob joins");

    let mut bob_events = bob.notifications();
    eventually(
        async || bob.participants().borrow().len() == 2,
        "both participants visible",
    )
    .await;

    alice.leave().await;

    eventually(
        async || {
            let roster = bob.participants().borrow().clone();
            roster.len() == 1 && roster[0].is_admin && bob.is_admin()
        },
        "bob holds the only admin flag",
    )
    .await;

    let promoted = expect_notification(&mut bob_events, NotificationKind::NewAdmin).await;
    assert_eq!(promoted.message, "🎉 You are now the room admin!");
}

#[tokio::test]
async fn test_admin_disconnect_promotes_peer_with_distinct_notifications() {
    let store = MemoryStore::new();
    let alice_conn = store.connect();
    let _alice = RoomClient::connect(alice_conn.clone(), "alice", "Alice", "deadbea7")
        .await
        .expect("alice joins");
    let bob = RoomClient::connect(store.connect(), "bob", "Bob", "deadbea7")
        .await
        .expect("bob joins");

    let mut bob_events = bob.notifications();
    eventually(
        async || bob.participants().borrow().len() == 2,
        "both participants visible",
    )
    .await;

    // Give Alice's presence task time to arm its disconnect hooks.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Alice's connection dies without a leave; the store applies her
    // disconnect hooks and Bob's finalizer reacts to the marker.
    alice_conn.shutdown().await;

    eventually(
        async || {
            let roster = bob.participants().borrow().clone();
            roster.len() == 1 && roster[0].id.as_str() == "bob" && roster[0].is_admin
        },
        "bob promoted after disconnect",
    )
    .await;

    let left = expect_notification(&mut bob_events, NotificationKind::UserLeft).await;
    assert_eq!(left.message, "Alice left the room");
    assert_eq!(left.auto_dismiss, Duration::from_secs(4));

    let promoted = expect_notification(&mut bob_events, NotificationKind::NewAdmin).await;
    assert_eq!(promoted.auto_dismiss, Duration::from_secs(3));
}

#[tokio::test]
async fn test_last_leave_deletes_room() {
    let store = MemoryStore::new();
    let probe = store.connect();
    let alice = RoomClient::connect(store.connect(), "alice", "Alice", "0d15ea5e")
        .await
        .expect("alice joins");

    alice.leave().await;

    eventually(
        async || {
            probe
                .get(&pointdeck_store::StorePath::parse("rooms/0d15ea5e").expect("path"))
                .await
                .expect("get")
                .is_none()
        },
        "room deleted after last leave",
    )
    .await;
}

#[tokio::test]
async fn test_title_updates_flow_between_clients() {
    let store = MemoryStore::new();
    let alice = RoomClient::connect(store.connect(), "alice", "Alice", "ab12cd34")
        .await
        .expect("alice joins");
    let bob = RoomClient::connect(store.connect(), "bob", "Bob", "ab12cd34")
        .await
        .expect("bob joins");

    assert_eq!(*alice.title().borrow(), "Sprint Planning Poker");

    let registry = pointdeck::Registry::new(store.connect());
    let room = RoomId::parse("ab12cd34").expect("valid");
    assert!(registry.set_title(&room, "Q3 Estimation").await);

    eventually(
        async || *bob.title().borrow() == "Q3 Estimation",
        "title propagates",
    )
    .await;
}

#[tokio::test]
async fn test_hide_after_reveal_via_countdown_toggle() {
    let store = MemoryStore::new();
    let alice = RoomClient::connect_with_config(
        store.connect(),
        "alice",
        "Alice",
        "5ca1ab1e",
        fast_config(),
    )
    .await
    .expect("alice joins");

    alice.select_card(Some(Card::L)).await;
    assert!(alice.reveal().await);
    eventually(async || *alice.revealed().borrow(), "revealed").await;

    // With cards already revealed, the countdown button hides instead.
    assert!(alice.start_countdown().await);
    eventually(async || !*alice.revealed().borrow(), "hidden again").await;
}
