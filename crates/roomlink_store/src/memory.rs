//! In-memory store for testing and ephemeral sessions.

use crate::error::StoreResult;
use crate::state::{ClientState, Room, Session, StateUpdate};
use crate::store::StateStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory state store.
///
/// Holds all state behind a single lock. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Sessions that do not need to survive the process
///
/// # Thread Safety
///
/// The store is thread-safe; an [`StateStore::apply`] call merges the whole
/// update under the write lock.
///
/// # Example
///
/// ```rust
/// use roomlink_store::{MemoryStore, StateStore, StateUpdate};
///
/// let store = MemoryStore::new();
/// store.apply(StateUpdate::new().transaction_counter(5)).unwrap();
/// assert_eq!(store.transaction_counter().unwrap(), 5);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<ClientState>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with pre-existing state.
    ///
    /// Useful for testing resume scenarios.
    #[must_use]
    pub fn with_state(state: ClientState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl StateStore for MemoryStore {
    fn snapshot(&self) -> StoreResult<ClientState> {
        Ok(self.state.read().clone())
    }

    fn apply(&self, update: StateUpdate) -> StoreResult<()> {
        update.apply_to(&mut self.state.write());
        Ok(())
    }

    fn session(&self) -> StoreResult<Option<Session>> {
        Ok(self.state.read().session.clone())
    }

    fn sync_token(&self) -> StoreResult<Option<String>> {
        Ok(self.state.read().sync_token.clone())
    }

    fn rooms(&self) -> StoreResult<HashMap<String, Room>> {
        Ok(self.state.read().rooms.clone())
    }

    fn room(&self, room_id: &str) -> StoreResult<Option<Room>> {
        Ok(self.state.read().rooms.get(room_id).cloned())
    }

    fn transaction_counter(&self) -> StoreResult<u64> {
        Ok(self.state.read().transaction_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RoomStatus;

    #[test]
    fn new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.session().unwrap().is_none());
        assert!(store.sync_token().unwrap().is_none());
        assert!(store.rooms().unwrap().is_empty());
        assert_eq!(store.transaction_counter().unwrap(), 0);
    }

    #[test]
    fn apply_merges_into_state() {
        let store = MemoryStore::new();
        store
            .apply(StateUpdate::new().sync_token("s1").transaction_counter(2))
            .unwrap();

        assert_eq!(store.sync_token().unwrap().as_deref(), Some("s1"));
        assert_eq!(store.transaction_counter().unwrap(), 2);
    }

    #[test]
    fn room_lookup() {
        let mut table = HashMap::new();
        table.insert("!a:hs".to_string(), Room::new("!a:hs", RoomStatus::Joined));

        let store = MemoryStore::new();
        store.apply(StateUpdate::new().rooms(table)).unwrap();

        assert!(store.room("!a:hs").unwrap().is_some());
        assert!(store.room("!missing:hs").unwrap().is_none());
    }

    #[test]
    fn with_state_seeds_store() {
        let mut state = ClientState::default();
        state.transaction_counter = 41;
        let store = MemoryStore::with_state(state);
        assert_eq!(store.transaction_counter().unwrap(), 41);
    }
}
