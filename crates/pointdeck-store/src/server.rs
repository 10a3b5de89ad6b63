//! Networked store host: serves a [`MemoryStore`] to remote clients.
//!
//! One handler task per accepted connection. The handler owns a
//! server-side [`MemoryClient`] for the socket, so disconnect hooks
//! registered over the wire are applied by the store the moment the
//! socket ends — gracefully or not. Subscription deliveries are pushed
//! through an outbound channel drained by a writer task, so a client
//! receives live updates while the read loop is parked on its socket.

use pointdeck_protocol::{Codec, JsonCodec, StoreEvent, StoreOp, StoreRequest};
use pointdeck_transport::{Connection, Listener, WsConnection, WsListener};
use tokio::sync::mpsc;

use crate::{MemoryClient, MemoryStore, StateStore, StoreError};

/// A WebSocket server hosting one [`MemoryStore`].
pub struct StoreServer {
    listener: WsListener,
    store: MemoryStore,
}

impl StoreServer {
    /// Binds the server to `addr` (`host:port`; port 0 picks a free one).
    pub async fn bind(addr: &str, store: MemoryStore) -> Result<Self, StoreError> {
        let listener = WsListener::bind(addr).await?;
        Ok(Self { listener, store })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the task is dropped or aborted.
    pub async fn run(mut self) {
        tracing::info!("store server running");
        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let client = self.store.connect();
                    tokio::spawn(handle_connection(conn, client));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn handle_connection(conn: WsConnection, client: MemoryClient) {
    let conn_id = conn.id();
    let codec = JsonCodec;

    // Outbound fan-in: acks from this loop, deliveries from per-sub tasks.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<StoreEvent>();
    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let bytes = match codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "dropping unencodable event");
                    continue;
                }
            };
            if writer_conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "store client closed connection");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "store client connection lost");
                break;
            }
        };

        let request: StoreRequest = match codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable store request");
                continue;
            }
        };

        let ack = apply(&client, request, &out_tx).await;
        if out_tx.send(ack).is_err() {
            break;
        }
    }

    // Socket gone: run this connection's disconnect hooks.
    client.shutdown().await;
    writer.abort();
}

/// Applies one request against the server-side client and builds its ack.
async fn apply(
    client: &MemoryClient,
    request: StoreRequest,
    out_tx: &mpsc::UnboundedSender<StoreEvent>,
) -> StoreEvent {
    let seq = request.seq;
    let result = match request.op {
        StoreOp::Get { path } => client.get(&path).await,
        StoreOp::Set { path, value } => client.set(&path, value).await.map(|()| None),
        StoreOp::Update { path, fields } => {
            client.update(&path, fields).await.map(|()| None)
        }
        StoreOp::Remove { path } => client.remove(&path).await.map(|()| None),
        StoreOp::OnDisconnect { path, action } => {
            client.on_disconnect(&path, action).await.map(|()| None)
        }
        StoreOp::Subscribe { sub_id, path } => {
            match client.subscribe(&path).await {
                Ok(mut rx) => {
                    // The initial snapshot is queued ahead of the ack on
                    // the same ordered outbound channel, so the client
                    // sees the current value before the subscribe call
                    // returns; the forwarder reports subsequent changes.
                    let current = rx.borrow_and_update().clone();
                    let _ = out_tx.send(StoreEvent::Sub { sub_id, value: current });
                    let forward_tx = out_tx.clone();
                    tokio::spawn(async move {
                        while rx.changed().await.is_ok() {
                            let value = rx.borrow_and_update().clone();
                            if forward_tx.send(StoreEvent::Sub { sub_id, value }).is_err() {
                                break;
                            }
                        }
                    });
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(value) => StoreEvent::Ack { seq, value, error: None },
        Err(e) => StoreEvent::Ack {
            seq,
            value: None,
            error: Some(e.to_string()),
        },
    }
}
