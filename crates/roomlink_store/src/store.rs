//! State store trait definition.

use crate::error::StoreResult;
use crate::state::{ClientState, Room, Session, StateUpdate};
use std::collections::HashMap;

/// Durable storage for client state.
///
/// The client reads the session, sync token, room table and transaction
/// counter through this trait and writes through [`StateStore::apply`]. An
/// implementation must apply one update atomically with respect to
/// concurrent readers and other updates.
///
/// Reads return owned snapshots. The accessors have default implementations
/// over [`StateStore::snapshot`]; implementations may override them to avoid
/// cloning the full state.
///
/// # Implementors
///
/// - [`crate::MemoryStore`] - For testing and ephemeral sessions
/// - [`crate::FileStore`] - JSON-file-backed persistence
pub trait StateStore: Send + Sync {
    /// Returns a copy of the entire persisted state.
    fn snapshot(&self) -> StoreResult<ClientState>;

    /// Merges a partial update into the persisted state.
    ///
    /// The update must be observed in full or not at all by any concurrent
    /// reader, and must be durable (for persistent stores) when this
    /// returns.
    fn apply(&self, update: StateUpdate) -> StoreResult<()>;

    /// Returns the live session, if any.
    fn session(&self) -> StoreResult<Option<Session>> {
        Ok(self.snapshot()?.session)
    }

    /// Returns the sync token of the last fully processed response.
    fn sync_token(&self) -> StoreResult<Option<String>> {
        Ok(self.snapshot()?.sync_token)
    }

    /// Returns a copy of the room table.
    fn rooms(&self) -> StoreResult<HashMap<String, Room>> {
        Ok(self.snapshot()?.rooms)
    }

    /// Returns the room record with the given id, if known.
    fn room(&self, room_id: &str) -> StoreResult<Option<Room>> {
        Ok(self.snapshot()?.rooms.remove(room_id))
    }

    /// Returns the current transaction counter.
    fn transaction_counter(&self) -> StoreResult<u64> {
        Ok(self.snapshot()?.transaction_counter)
    }
}

impl<S: StateStore + ?Sized> StateStore for std::sync::Arc<S> {
    fn snapshot(&self) -> StoreResult<ClientState> {
        (**self).snapshot()
    }

    fn apply(&self, update: StateUpdate) -> StoreResult<()> {
        (**self).apply(update)
    }

    fn session(&self) -> StoreResult<Option<Session>> {
        (**self).session()
    }

    fn sync_token(&self) -> StoreResult<Option<String>> {
        (**self).sync_token()
    }

    fn rooms(&self) -> StoreResult<HashMap<String, Room>> {
        (**self).rooms()
    }

    fn room(&self, room_id: &str) -> StoreResult<Option<Room>> {
        (**self).room(room_id)
    }

    fn transaction_counter(&self) -> StoreResult<u64> {
        (**self).transaction_counter()
    }
}
