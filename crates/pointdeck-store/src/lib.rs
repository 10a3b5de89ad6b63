//! The shared state tree store.
//!
//! Everything the coordination engine knows about the world lives in one
//! tree of JSON values, shared by every client of a session. This crate
//! provides:
//!
//! - [`StateStore`] — the trait the engine is written against:
//!   asynchronous reads/writes, live subscriptions, a connection-state
//!   feed, and disconnect-triggered write hooks.
//! - [`MemoryStore`] / [`MemoryClient`] — the in-process implementation.
//!   One `MemoryStore` holds the tree; each [`MemoryStore::connect`]
//!   handle models one client connection with its own disconnect hooks.
//! - [`StoreServer`] / [`RemoteStore`] — the networked pair: the server
//!   hosts a `MemoryStore` for clients in other processes, speaking the
//!   `pointdeck-protocol` wire format over WebSocket.
//! - [`map_feed`] — adapter from raw subscription feeds to typed,
//!   deduplicated ones.
//!
//! # Semantics
//!
//! The store is deliberately weak — the engine's protocols are designed
//! around these limits, not shielded from them:
//!
//! - Single-key last-write-wins. No cross-key transactions, no CAS.
//! - `set` of `null` removes; `update` merges fields, and a `null` field
//!   deletes that child; empty object nodes do not exist (removing the
//!   last child removes the node, transitively).
//! - A subscription fires immediately with the current value, then on
//!   every write at, below, or above its path.
//! - Disconnect hooks are unconditional `set`/`remove` mutations applied
//!   in registration order when the owning connection ends, however it
//!   ends.

#![allow(async_fn_in_trait)]

mod error;
mod feed;
mod memory;
mod remote;
mod server;
mod tree;

pub use error::StoreError;
pub use feed::map_feed;
pub use memory::{MemoryClient, MemoryStore};
pub use remote::RemoteStore;
pub use server::StoreServer;

use std::future::Future;

use tokio::sync::watch;

pub use pointdeck_protocol::{DisconnectAction, Fields, StorePath, Value};

/// A client connection to the shared state tree.
///
/// Implementations are cheap to clone; clones share the same underlying
/// connection (and therefore the same disconnect hooks).
pub trait StateStore: Clone + Send + Sync + 'static {
    /// Reads the subtree at `path`. `None` when it does not exist.
    fn get(
        &self,
        path: &StorePath,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Replaces the subtree at `path`. Writing `null` removes it.
    fn set(
        &self,
        path: &StorePath,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merges `fields` into the node at `path`. A field key may address a
    /// nested child with `/`; a `null` field value deletes that child.
    fn update(
        &self,
        path: &StorePath,
        fields: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the subtree at `path`.
    fn remove(&self, path: &StorePath) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Opens a live feed of the subtree at `path`.
    ///
    /// The returned receiver holds the current value and is marked
    /// changed, so a `changed().await` loop observes it immediately;
    /// thereafter it fires on every overlapping write.
    fn subscribe(
        &self,
        path: &StorePath,
    ) -> impl Future<Output = Result<watch::Receiver<Option<Value>>, StoreError>> + Send;

    /// Live feed of this connection's liveness. `true` while the
    /// connection is established.
    fn connection_state(&self) -> watch::Receiver<bool>;

    /// Registers a mutation the store applies when this connection ends.
    fn on_disconnect(
        &self,
        path: &StorePath,
        action: DisconnectAction,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
