//! Integration tests for the in-memory store: subscription fan-out and
//! disconnect hooks across multiple client connections.

use pointdeck_store::{DisconnectAction, MemoryStore, StateStore, StorePath};
use serde_json::json;

fn path(raw: &str) -> StorePath {
    StorePath::parse(raw).expect("valid test path")
}

#[tokio::test]
async fn test_writes_are_visible_across_connections() {
    let store = MemoryStore::new();
    let alice = store.connect();
    let bob = store.connect();

    alice
        .set(&path("rooms/a1b2c3d4/title"), json!("Sprint 12"))
        .await
        .expect("set");

    let seen = bob.get(&path("rooms/a1b2c3d4/title")).await.expect("get");
    assert_eq!(seen, Some(json!("Sprint 12")));
}

#[tokio::test]
async fn test_subscribe_fires_immediately_with_current_value() {
    let store = MemoryStore::new();
    let client = store.connect();
    client
        .set(&path("rooms/a/revealed"), json!(true))
        .await
        .expect("set");

    let mut feed = client.subscribe(&path("rooms/a")).await.expect("subscribe");
    feed.changed().await.expect("initial wakeup");
    let value = feed.borrow_and_update().clone();
    assert_eq!(value, Some(json!({ "revealed": true })));
}

#[tokio::test]
async fn test_subscribe_fires_on_descendant_write() {
    let store = MemoryStore::new();
    let writer = store.connect();
    let watcher = store.connect();

    let mut feed = watcher
        .subscribe(&path("rooms/a/participants"))
        .await
        .expect("subscribe");
    feed.borrow_and_update();

    writer
        .set(
            &path("rooms/a/participants/u1"),
            json!({ "id": "u1", "name": "Alice" }),
        )
        .await
        .expect("set");

    feed.changed().await.expect("write wakeup");
    let value = feed.borrow_and_update().clone().expect("present");
    assert!(value.get("u1").is_some());
}

#[tokio::test]
async fn test_subscribe_fires_on_ancestor_removal() {
    let store = MemoryStore::new();
    let client = store.connect();
    client
        .set(&path("rooms/a/participants/u1"), json!({ "id": "u1" }))
        .await
        .expect("set");

    let mut feed = client
        .subscribe(&path("rooms/a/participants/u1"))
        .await
        .expect("subscribe");
    feed.borrow_and_update();

    client.remove(&path("rooms/a")).await.expect("remove");

    feed.changed().await.expect("removal wakeup");
    assert_eq!(*feed.borrow_and_update(), None);
}

#[tokio::test]
async fn test_disconnect_hooks_apply_in_registration_order() {
    let store = MemoryStore::new();
    let observer = store.connect();
    let dropper = store.connect();

    dropper
        .set(&path("rooms/a/presence/u1"), json!(true))
        .await
        .expect("set presence");
    dropper
        .set(&path("rooms/a/participants/u1"), json!({ "id": "u1" }))
        .await
        .expect("set participant");

    dropper
        .on_disconnect(&path("rooms/a/presence/u1"), DisconnectAction::Remove)
        .await
        .expect("hook");
    dropper
        .on_disconnect(&path("rooms/a/participants/u1"), DisconnectAction::Remove)
        .await
        .expect("hook");
    dropper
        .on_disconnect(
            &path("rooms/a/disconnects/u1"),
            DisconnectAction::Set { value: json!("2026-08-06T00:00:00Z") },
        )
        .await
        .expect("hook");

    dropper.shutdown().await;

    assert_eq!(observer.get(&path("rooms/a/presence/u1")).await.expect("get"), None);
    assert_eq!(
        observer.get(&path("rooms/a/participants/u1")).await.expect("get"),
        None
    );
    assert_eq!(
        observer.get(&path("rooms/a/disconnects/u1")).await.expect("get"),
        Some(json!("2026-08-06T00:00:00Z"))
    );
}

#[tokio::test]
async fn test_operations_after_shutdown_fail_closed() {
    let store = MemoryStore::new();
    let client = store.connect();
    client.shutdown().await;

    let result = client.set(&path("rooms/a/title"), json!("x")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connection_state_flips_on_shutdown() {
    let store = MemoryStore::new();
    let client = store.connect();

    let mut state = client.connection_state();
    assert!(*state.borrow_and_update());

    client.shutdown().await;
    state.changed().await.expect("state wakeup");
    assert!(!*state.borrow_and_update());
}
