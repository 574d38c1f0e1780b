//! # Roomlink Store
//!
//! Client state store trait and implementations for roomlink.
//!
//! The store holds everything the client persists between syncs:
//! - The account session (user id, access token, homeserver, device id)
//! - The sync token (cursor into the server's event stream)
//! - The room table (one record per observed room)
//! - The transaction counter backing idempotent sends
//!
//! ## Design Principles
//!
//! - The store is an explicit collaborator injected into the client, never a
//!   process global
//! - Partial writes go through [`StateUpdate`], applied atomically under the
//!   store's internal lock
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral sessions
//! - [`FileStore`] - JSON-file-backed persistence
//!
//! ## Example
//!
//! ```rust
//! use roomlink_store::{MemoryStore, StateStore, StateUpdate};
//!
//! let store = MemoryStore::new();
//! store.apply(StateUpdate::new().sync_token("s100_200")).unwrap();
//! assert_eq!(store.sync_token().unwrap().as_deref(), Some("s100_200"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod state;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::{ClientState, Room, RoomStatus, Session, StateUpdate};
pub use store::StateStore;
