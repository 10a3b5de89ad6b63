//! Remote store client: [`StateStore`] over a WebSocket.
//!
//! Requests are correlated with acks by sequence number; subscription
//! deliveries are fanned into per-subscription watch channels by a reader
//! task. When the socket ends, the connection-state feed flips to `false`
//! and every pending request fails with [`StoreError::Closed`] — there is
//! no reconnection or offline queueing at this layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pointdeck_protocol::{
    Codec, DisconnectAction, Fields, JsonCodec, StoreEvent, StoreOp, StorePath, StoreRequest,
    Value,
};
use pointdeck_transport::{Connection, WsConnection, ws_connect};
use tokio::sync::{Mutex, oneshot, watch};

use crate::{StateStore, StoreError};

type AckSender = oneshot::Sender<Result<Option<Value>, StoreError>>;

struct RemoteInner {
    conn: WsConnection,
    codec: JsonCodec,
    next_seq: AtomicU64,
    next_sub: AtomicU64,
    pending: Mutex<HashMap<u64, AckSender>>,
    subs: Mutex<HashMap<u64, watch::Sender<Option<Value>>>>,
    connected: watch::Sender<bool>,
}

/// A client connection to a remote [`StoreServer`](crate::StoreServer).
#[derive(Clone)]
pub struct RemoteStore {
    inner: Arc<RemoteInner>,
}

impl RemoteStore {
    /// Dials the store server at `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, StoreError> {
        let conn = ws_connect(addr).await?;
        let (connected, _) = watch::channel(true);
        let inner = Arc::new(RemoteInner {
            conn,
            codec: JsonCodec,
            next_seq: AtomicU64::new(1),
            next_sub: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            subs: Mutex::new(HashMap::new()),
            connected,
        });

        tokio::spawn(read_loop(Arc::clone(&inner)));
        tracing::info!(addr, "connected to store server");
        Ok(Self { inner })
    }

    /// Closes the connection. The server applies this connection's
    /// disconnect hooks on seeing the socket end.
    pub async fn close(&self) {
        let _ = self.inner.conn.close().await;
    }

    async fn request(&self, op: StoreOp) -> Result<Option<Value>, StoreError> {
        if !*self.inner.connected.borrow() {
            return Err(StoreError::Closed);
        }
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (ack_tx, ack_rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(seq, ack_tx);

        let bytes = self.inner.codec.encode(&StoreRequest { seq, op })?;
        if let Err(e) = self.inner.conn.send(&bytes).await {
            self.inner.pending.lock().await.remove(&seq);
            return Err(e.into());
        }

        ack_rx.await.unwrap_or(Err(StoreError::Closed))
    }
}

/// Dispatches inbound events until the socket ends, then fails everything
/// still waiting.
async fn read_loop(inner: Arc<RemoteInner>) {
    loop {
        let data = match inner.conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "store connection lost");
                break;
            }
        };

        let event: StoreEvent = match inner.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable store event");
                continue;
            }
        };

        match event {
            StoreEvent::Ack { seq, value, error } => {
                let waiter = inner.pending.lock().await.remove(&seq);
                if let Some(waiter) = waiter {
                    let result = match error {
                        Some(message) => Err(StoreError::Rejected(message)),
                        None => Ok(value),
                    };
                    let _ = waiter.send(result);
                }
            }
            StoreEvent::Sub { sub_id, value } => {
                let subs = inner.subs.lock().await;
                if let Some(tx) = subs.get(&sub_id) {
                    let _ = tx.send(value);
                }
            }
        }
    }

    let _ = inner.connected.send(false);
    let mut pending = inner.pending.lock().await;
    for (_, waiter) in pending.drain() {
        let _ = waiter.send(Err(StoreError::Closed));
    }
    inner.subs.lock().await.clear();
}

impl StateStore for RemoteStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.request(StoreOp::Get { path: path.clone() }).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.request(StoreOp::Set { path: path.clone(), value })
            .await
            .map(|_| ())
    }

    async fn update(&self, path: &StorePath, fields: Fields) -> Result<(), StoreError> {
        self.request(StoreOp::Update { path: path.clone(), fields })
            .await
            .map(|_| ())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.request(StoreOp::Remove { path: path.clone() })
            .await
            .map(|_| ())
    }

    async fn subscribe(
        &self,
        path: &StorePath,
    ) -> Result<watch::Receiver<Option<Value>>, StoreError> {
        let sub_id = self.inner.next_sub.fetch_add(1, Ordering::Relaxed);

        // Register the channel first: the server queues the initial
        // snapshot as a Sub event ahead of the ack on the same ordered
        // stream, so by the time the ack resolves the reader has already
        // seeded the channel with the current value.
        let (tx, mut rx) = watch::channel(None);
        self.inner.subs.lock().await.insert(sub_id, tx);

        if let Err(e) = self
            .request(StoreOp::Subscribe { sub_id, path: path.clone() })
            .await
        {
            self.inner.subs.lock().await.remove(&sub_id);
            return Err(e);
        }

        rx.mark_changed();
        Ok(rx)
    }

    fn connection_state(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    async fn on_disconnect(
        &self,
        path: &StorePath,
        action: DisconnectAction,
    ) -> Result<(), StoreError> {
        self.request(StoreOp::OnDisconnect { path: path.clone(), action })
            .await
            .map(|_| ())
    }
}
