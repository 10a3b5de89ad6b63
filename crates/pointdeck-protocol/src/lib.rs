//! Wire protocol for the Pointdeck shared state store.
//!
//! This crate defines the "language" spoken between a store client and a
//! store server:
//!
//! - **Paths** ([`StorePath`]) — validated locations in the state tree.
//! - **Messages** ([`StoreRequest`], [`StoreOp`], [`StoreEvent`],
//!   [`DisconnectAction`]) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the store
//! (tree semantics). It doesn't know about rooms, participants, or
//! subscriptions' delivery — it only knows how to name tree locations and
//! serialize operations on them.
//!
//! ```text
//! Transport (bytes) → Protocol (StoreRequest/StoreEvent) → Store (tree)
//! ```

mod codec;
mod error;
mod path;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use path::StorePath;
pub use types::{DisconnectAction, StoreEvent, StoreOp, StoreRequest};

/// The value type stored at every tree node.
///
/// The store is schemaless: leaves are JSON scalars, interior nodes are
/// JSON objects keyed by child name. Re-exported so engine crates don't
/// need their own `serde_json` spelling for it.
pub use serde_json::Value;

/// An object map of named fields, as used by merge-updates.
pub type Fields = serde_json::Map<String, Value>;
