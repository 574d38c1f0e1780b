//! # Roomlink Client
//!
//! Sync engine and client facade for the roomlink messaging protocol.
//!
//! This crate provides:
//! - Sync loop state machine (stopped → starting → running ⇄ retrying)
//! - Cursor management with at-least-once event delivery
//! - Room table reconciliation with a monotone status transition graph
//! - Typed client events with per-kind subscriptions
//! - Retry with exponential backoff
//! - Transport abstraction with a scripted mock for tests
//!
//! ## Architecture
//!
//! The client is a **single-account, single-homeserver** consumer of a
//! room-based sync protocol. One sync loop instance advances the server
//! cursor; it is the only writer of the cursor and the room table, and the
//! only dispatcher of inbound events. Caller-initiated actions (send, join,
//! invite) run concurrently against the same store under their own critical
//! sections.
//!
//! ## Key Invariants
//!
//! - The cursor is persisted only after a response is fully processed and is
//!   never rewound
//! - Room status moves only along invited → joined → left
//! - Transaction ids are unique for the life of the store
//! - Only the sync loop retries; every other operation is single-attempt

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod client;
mod config;
mod error;
mod event;
mod reconcile;
mod router;
mod sync;
mod transport;
mod txn;

pub use auth::AuthorizationGuard;
pub use client::Client;
pub use config::{ClientConfig, RetryConfig, RetryDecision};
pub use error::{ClientError, ClientResult};
pub use event::{ClientEvent, ClientEventKind, InviteEvent, MembershipChange, MessageEvent};
pub use reconcile::{apply_room_deltas, deltas_from_sync, RoomDelta};
pub use router::{decode_events, EventRouter, SubscriptionId};
pub use sync::{Credentials, SyncLoop, SyncState, SyncStats};
pub use transport::{
    Method, MockTransport, RecordedCall, Transport, TransportError, TransportResult,
};
pub use txn::TransactionSequencer;
