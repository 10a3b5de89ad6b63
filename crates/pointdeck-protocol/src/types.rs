//! Wire message types exchanged between a store client and server.
//!
//! Every client→server message is a [`StoreRequest`] carrying a sequence
//! number and one [`StoreOp`]; every server→client message is a
//! [`StoreEvent`]. Acks echo the request's sequence number so the client
//! can correlate replies; subscription deliveries carry the client-chosen
//! subscription id instead.

use serde::{Deserialize, Serialize};

use crate::{Fields, StorePath, Value};

/// A mutation the store applies on the client's behalf when the client's
/// connection ends, however it ends.
///
/// This is the only "server-side logic" the store offers: no conditions,
/// no reads — an unconditional write or removal at a fixed path. Richer
/// disconnect handling (admin succession, empty-room checks) is layered
/// on top by the engine via marker nodes that still-connected peers watch.
///
/// `#[serde(tag = "type")]` gives the internally tagged JSON form
/// `{ "type": "Set", "value": ... }` / `{ "type": "Remove" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DisconnectAction {
    /// Write `value` at the registered path.
    Set { value: Value },
    /// Remove the subtree at the registered path.
    Remove,
}

/// A single store operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreOp {
    /// Read the subtree at `path`. Acked with its current value.
    Get { path: StorePath },

    /// Replace the subtree at `path`. A `null` value removes it.
    Set { path: StorePath, value: Value },

    /// Merge `fields` into the node at `path`. A field whose key contains
    /// `/` addresses a nested child; a `null` field value deletes that
    /// child.
    Update { path: StorePath, fields: Fields },

    /// Remove the subtree at `path`.
    Remove { path: StorePath },

    /// Open a live feed of the subtree at `path`. The server sends a
    /// [`StoreEvent::Sub`] with the current value immediately, then one
    /// for every overlapping change. `sub_id` is chosen by the client and
    /// scopes deliveries to this subscription.
    Subscribe { sub_id: u64, path: StorePath },

    /// Register a disconnect-triggered write for this connection.
    /// Actions run in registration order when the connection ends.
    OnDisconnect {
        path: StorePath,
        action: DisconnectAction,
    },
}

/// A client→server request: one operation plus a correlation number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Client-assigned, strictly increasing per connection.
    pub seq: u64,
    /// The operation to apply.
    pub op: StoreOp,
}

/// A server→client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    /// Reply to the request with the same `seq`. `value` carries the
    /// result of a `Get` (absent for mutations); `error` is set when the
    /// operation was rejected.
    Ack {
        seq: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A subscription delivery: the current value of the subscribed
    /// subtree (`None` when the subtree does not exist).
    Sub { sub_id: u64, value: Option<Value> },
}
