//! In-process store: one shared tree, many client connections.
//!
//! `MemoryStore` is both the store every local client connects to and the
//! core the networked [`StoreServer`](crate::StoreServer) hosts. Each
//! [`MemoryClient`] models one client connection: it carries its own
//! liveness feed and its own ordered list of disconnect hooks, so tests
//! (and the server) can end a connection and watch the store apply the
//! registered cleanup writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pointdeck_protocol::{DisconnectAction, Fields, StorePath, Value};
use serde_json::Map;
use tokio::sync::{Mutex, watch};

use crate::{StateStore, StoreError, tree};

/// The shared tree plus everything per-connection.
struct CoreState {
    tree: Value,
    subs: Vec<Subscription>,
    hooks: HashMap<u64, Vec<(StorePath, DisconnectAction)>>,
}

struct Subscription {
    path: StorePath,
    tx: watch::Sender<Option<Value>>,
}

pub(crate) struct Core {
    state: Mutex<CoreState>,
    next_conn: AtomicU64,
}

impl Core {
    fn new() -> Self {
        Self {
            state: Mutex::new(CoreState {
                tree: Value::Object(Map::new()),
                subs: Vec::new(),
                hooks: HashMap::new(),
            }),
            next_conn: AtomicU64::new(1),
        }
    }

    pub(crate) async fn get(&self, path: &StorePath) -> Option<Value> {
        let state = self.state.lock().await;
        tree::get_at(&state.tree, path).cloned()
    }

    pub(crate) async fn set(&self, path: &StorePath, value: Value) {
        let mut state = self.state.lock().await;
        tree::set_at(&mut state.tree, path, value);
        notify(&mut state, path);
    }

    pub(crate) async fn update(&self, path: &StorePath, fields: &Fields) {
        let mut state = self.state.lock().await;
        tree::update_at(&mut state.tree, path, fields);
        notify(&mut state, path);
    }

    pub(crate) async fn remove(&self, path: &StorePath) {
        let mut state = self.state.lock().await;
        tree::remove_at(&mut state.tree, path);
        notify(&mut state, path);
    }

    pub(crate) async fn subscribe(
        &self,
        path: &StorePath,
    ) -> watch::Receiver<Option<Value>> {
        let mut state = self.state.lock().await;
        let current = tree::get_at(&state.tree, path).cloned();
        let (tx, mut rx) = watch::channel(current);
        state.subs.push(Subscription { path: path.clone(), tx });
        // The feed contract: the first `changed().await` resolves
        // immediately with the value that was current at subscribe time.
        rx.mark_changed();
        rx
    }

    pub(crate) async fn register_hook(
        &self,
        conn: u64,
        path: StorePath,
        action: DisconnectAction,
    ) {
        let mut state = self.state.lock().await;
        state.hooks.entry(conn).or_default().push((path, action));
    }

    /// Applies a closed connection's hooks in registration order.
    pub(crate) async fn run_disconnect(&self, conn: u64) {
        let mut state = self.state.lock().await;
        let hooks = state.hooks.remove(&conn).unwrap_or_default();
        for (path, action) in hooks {
            tracing::debug!(conn, %path, ?action, "applying disconnect hook");
            match action {
                DisconnectAction::Set { value } => {
                    tree::set_at(&mut state.tree, &path, value);
                }
                DisconnectAction::Remove => {
                    tree::remove_at(&mut state.tree, &path);
                }
            }
            notify(&mut state, &path);
        }
    }
}

/// Pushes the current value at every subscription overlapping `written`.
/// Subscriptions whose receivers are all gone are dropped on the way.
fn notify(state: &mut CoreState, written: &StorePath) {
    state.subs.retain(|sub| !sub.tx.is_closed());
    // Split borrow: read the tree while sending through the senders.
    let CoreState { tree, subs, .. } = state;
    for sub in subs.iter() {
        if sub.path.overlaps(written) {
            let value = tree::get_at(tree, &sub.path).cloned();
            let _ = sub.tx.send(value);
        }
    }
}

/// An in-process shared state tree. Cheap to clone; all clones share the
/// same tree.
#[derive(Clone)]
pub struct MemoryStore {
    core: Arc<Core>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { core: Arc::new(Core::new()) }
    }

    /// Opens a new client connection to this store.
    pub fn connect(&self) -> MemoryClient {
        let conn = self.core.next_conn.fetch_add(1, Ordering::Relaxed);
        let (connected, _) = watch::channel(true);
        tracing::debug!(conn, "memory store connection opened");
        MemoryClient {
            core: Arc::clone(&self.core),
            conn,
            connected: Arc::new(connected),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One client connection to a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryClient {
    core: Arc<Core>,
    conn: u64,
    connected: Arc<watch::Sender<bool>>,
}

impl MemoryClient {
    /// Ends this connection: marks it dead and applies its registered
    /// disconnect hooks in order. Safe to call twice.
    pub async fn shutdown(&self) {
        let was_connected = self.connected.send_replace(false);
        if was_connected {
            tracing::debug!(conn = self.conn, "memory store connection closed");
            self.core.run_disconnect(self.conn).await;
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if *self.connected.borrow() {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

impl StateStore for MemoryClient {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.ensure_open()?;
        Ok(self.core.get(path).await)
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.core.set(path, value).await;
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Fields) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.core.update(path, &fields).await;
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.core.remove(path).await;
        Ok(())
    }

    async fn subscribe(
        &self,
        path: &StorePath,
    ) -> Result<watch::Receiver<Option<Value>>, StoreError> {
        self.ensure_open()?;
        Ok(self.core.subscribe(path).await)
    }

    fn connection_state(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    async fn on_disconnect(
        &self,
        path: &StorePath,
        action: DisconnectAction,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.core.register_hook(self.conn, path.clone(), action).await;
        Ok(())
    }
}
