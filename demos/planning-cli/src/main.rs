//! Two simulated clients walk through a full estimation round on one
//! in-process store: join, vote, countdown, reveal, winning card, reset,
//! admin hand-off on leave.
//!
//! Run with `RUST_LOG=pointdeck=debug` for the engine's view of events.

use std::time::Duration;

use pointdeck::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), JoinError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = MemoryStore::new();
    let room_id = RoomId::generate();
    println!("room: {room_id}");

    let alice =
        RoomClient::connect(store.connect(), "alice", "Alice", room_id.as_str()).await?;
    let bob = RoomClient::connect(store.connect(), "bob", "Bob", room_id.as_str()).await?;

    // Print Bob's toasts as they arrive, like a UI would.
    let mut bob_events = bob.notifications();
    tokio::spawn(async move {
        while let Ok(event) = bob_events.recv().await {
            println!("[bob] {} (dismiss after {:?})", event.message, event.auto_dismiss);
        }
    });

    println!(
        "alice admin: {}, bob admin: {}",
        alice.is_admin(),
        bob.is_admin()
    );

    alice.select_card(Some(Card::M)).await;
    bob.select_card(Some(Card::S)).await;
    println!("cards picked, starting countdown…");

    // Watch the replicated countdown from Bob's side.
    let mut display = bob.countdown();
    let display_task = tokio::spawn(async move {
        while display.changed().await.is_ok() {
            let phase = *display.borrow_and_update();
            if phase != CountdownPhase::Idle {
                println!("[bob] countdown: {phase}");
            }
        }
    });

    alice.start_countdown().await;

    // Default timing: 3 ticks × 800 ms + 500 ms reveal hold.
    tokio::time::sleep(Duration::from_secs(4)).await;
    println!(
        "revealed: {}, winning card: {}",
        *bob.revealed().borrow(),
        bob.winning_card().as_deref().unwrap_or("-")
    );

    alice.reset().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let roster = bob.participants().borrow().clone();
    println!(
        "after reset, selections cleared: {}",
        roster.iter().all(|p| p.selected_card.is_none() && !p.is_revealed)
    );

    // Alice leaves; Bob inherits the admin flag (watch his toast).
    alice.leave().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("bob admin after alice left: {}", bob.is_admin());

    display_task.abort();
    bob.leave().await;
    println!("done");
    Ok(())
}
