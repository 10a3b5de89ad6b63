//! Integration tests for the networked store pair: a `StoreServer`
//! hosting a `MemoryStore` on localhost, driven by `RemoteStore` clients.

use std::time::Duration;

use pointdeck_store::{
    DisconnectAction, MemoryStore, RemoteStore, StateStore, StorePath, StoreServer,
};
use serde_json::json;

fn path(raw: &str) -> StorePath {
    StorePath::parse(raw).expect("valid test path")
}

/// Starts a server on an OS-assigned port and returns its address.
async fn start_server(store: MemoryStore) -> String {
    let server = StoreServer::bind("127.0.0.1:0", store).await.expect("bind");
    let addr = server.local_addr().expect("local addr").to_string();
    tokio::spawn(server.run());
    addr
}

/// Polls `check` until it passes or the deadline expires.
async fn eventually<F>(mut check: F, what: &str)
where
    F: AsyncFnMut() -> bool,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline: {what}");
}

#[tokio::test]
async fn test_remote_set_then_get_round_trips() {
    let addr = start_server(MemoryStore::new()).await;
    let client = RemoteStore::connect(&addr).await.expect("connect");

    client
        .set(&path("rooms/a1b2c3d4/title"), json!("Remote Planning"))
        .await
        .expect("set");

    let seen = client.get(&path("rooms/a1b2c3d4/title")).await.expect("get");
    assert_eq!(seen, Some(json!("Remote Planning")));
}

#[tokio::test]
async fn test_remote_subscribe_sees_initial_value_and_live_writes() {
    let store = MemoryStore::new();
    let addr = start_server(store.clone()).await;

    let local = store.connect();
    local
        .set(&path("rooms/a/revealed"), json!(false))
        .await
        .expect("seed");

    let remote = RemoteStore::connect(&addr).await.expect("connect");
    let mut feed = remote.subscribe(&path("rooms/a")).await.expect("subscribe");

    feed.changed().await.expect("initial wakeup");
    let initial = feed.borrow_and_update().clone();
    assert_eq!(initial, Some(json!({ "revealed": false })));

    // A write from a completely different connection must reach the feed.
    local
        .set(&path("rooms/a/revealed"), json!(true))
        .await
        .expect("write");

    feed.changed().await.expect("live wakeup");
    let updated = feed.borrow_and_update().clone();
    assert_eq!(updated, Some(json!({ "revealed": true })));
}

#[tokio::test]
async fn test_remote_update_with_null_field_deletes_child() {
    let addr = start_server(MemoryStore::new()).await;
    let client = RemoteStore::connect(&addr).await.expect("connect");

    client
        .set(
            &path("rooms/a/participants/u1"),
            json!({ "id": "u1", "selectedCard": "M" }),
        )
        .await
        .expect("set");

    let mut fields = pointdeck_store::Fields::new();
    fields.insert("selectedCard".into(), serde_json::Value::Null);
    client
        .update(&path("rooms/a/participants/u1"), fields)
        .await
        .expect("update");

    let seen = client
        .get(&path("rooms/a/participants/u1"))
        .await
        .expect("get");
    assert_eq!(seen, Some(json!({ "id": "u1" })));
}

#[tokio::test]
async fn test_remote_disconnect_hooks_fire_when_socket_closes() {
    let store = MemoryStore::new();
    let addr = start_server(store.clone()).await;
    let observer = store.connect();

    let dropper = RemoteStore::connect(&addr).await.expect("connect");
    dropper
        .set(&path("rooms/a/presence/u1"), json!(true))
        .await
        .expect("set");
    dropper
        .on_disconnect(&path("rooms/a/presence/u1"), DisconnectAction::Remove)
        .await
        .expect("hook");
    dropper
        .on_disconnect(
            &path("rooms/a/disconnects/u1"),
            DisconnectAction::Set { value: json!("marker") },
        )
        .await
        .expect("hook");

    dropper.close().await;

    eventually(
        async || {
            observer
                .get(&path("rooms/a/presence/u1"))
                .await
                .expect("get")
                .is_none()
        },
        "presence removed by disconnect hook",
    )
    .await;
    assert_eq!(
        observer.get(&path("rooms/a/disconnects/u1")).await.expect("get"),
        Some(json!("marker"))
    );
}

#[tokio::test]
async fn test_remote_connection_state_flips_when_server_side_closes() {
    let store = MemoryStore::new();
    let addr = start_server(store).await;

    let client = RemoteStore::connect(&addr).await.expect("connect");
    let mut state = client.connection_state();
    assert!(*state.borrow_and_update());

    client.close().await;
    state.changed().await.expect("state wakeup");
    assert!(!*state.borrow_and_update());
}
