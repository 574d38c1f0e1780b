//! JSON-file-backed store for persistent sessions.

use crate::error::{StoreError, StoreResult};
use crate::state::{ClientState, Room, Session, StateUpdate};
use crate::store::StateStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A state store persisted as a single JSON snapshot file.
///
/// The full state is kept in memory behind a lock; every applied update is
/// written back to disk before [`StateStore::apply`] returns. Writes go to a
/// sibling temp file that is renamed over the snapshot, so a crash mid-write
/// leaves the previous snapshot intact.
///
/// # Example
///
/// ```no_run
/// use roomlink_store::{FileStore, StateStore, StateUpdate};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("session.json")).unwrap();
/// store.apply(StateUpdate::new().sync_token("s100")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<ClientState>,
}

impl FileStore {
    /// Opens or creates a file store at the given path.
    ///
    /// An existing snapshot is loaded; a missing file starts empty. The file
    /// is only created once the first update is applied.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or parsed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let state = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::Corrupted(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientState::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    /// Opens or creates a file store, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the snapshot
    /// cannot be read.
    pub fn open_with_create_dirs(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes `state` and renames it over the snapshot file.
    fn persist(&self, state: &ClientState) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for FileStore {
    fn snapshot(&self) -> StoreResult<ClientState> {
        Ok(self.state.read().clone())
    }

    fn apply(&self, update: StateUpdate) -> StoreResult<()> {
        let mut state = self.state.write();
        update.apply_to(&mut state);
        self.persist(&state)
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
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("state.json")).unwrap();
        assert!(store.session().unwrap().is_none());
        assert_eq!(store.transaction_counter().unwrap(), 0);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = FileStore::open(&path).unwrap();
            let mut table = HashMap::new();
            table.insert("!a:hs".to_string(), Room::new("!a:hs", RoomStatus::Joined));
            store
                .apply(
                    StateUpdate::new()
                        .sync_token("s42")
                        .rooms(table)
                        .transaction_counter(9),
                )
                .unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.sync_token().unwrap().as_deref(), Some("s42"));
        assert_eq!(reopened.transaction_counter().unwrap(), 9);
        assert_eq!(
            reopened.room("!a:hs").unwrap().unwrap().status,
            RoomStatus::Joined
        );
    }

    #[test]
    fn corrupted_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn create_dirs_builds_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");

        let store = FileStore::open_with_create_dirs(&path).unwrap();
        store.apply(StateUpdate::new().sync_token("s1")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn no_file_written_before_first_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let _store = FileStore::open(&path).unwrap();
        assert!(!path.exists());
    }
}
