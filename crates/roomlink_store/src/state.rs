//! Persisted client state and partial updates.

use roomlink_protocol::RoomEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An authenticated account session.
///
/// Created from a successful login response. Exactly one session is live per
/// client instance; it is replaced wholesale on re-login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Fully qualified user id.
    pub user_id: String,
    /// Bearer token for authenticated calls.
    pub access_token: String,
    /// Homeserver that issued the session.
    pub home_server: String,
    /// Device id bound to the session.
    pub device_id: String,
}

/// Membership status of a room from this client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// The user has a pending invite.
    Invited,
    /// The user is a member.
    Joined,
    /// The user left or declined. Terminal for this client's view.
    Left,
}

impl RoomStatus {
    /// Returns true if a room may move from `self` to `next`.
    ///
    /// The allowed edges are Invited→Joined, Invited→Left and Joined→Left.
    /// There is no way out of Left and no way back into Invited.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Invited, RoomStatus::Joined)
                | (RoomStatus::Invited, RoomStatus::Left)
                | (RoomStatus::Joined, RoomStatus::Left)
        )
    }
}

/// A single room record in the client's room table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room id; the record's identity.
    pub id: String,
    /// Membership status.
    pub status: RoomStatus,
    /// Known members, deduplicated, in observation order.
    #[serde(default)]
    pub members: Vec<String>,
    /// Most recent message event observed in this room, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<RoomEvent>,
}

impl Room {
    /// Creates a new room record with no members.
    pub fn new(id: impl Into<String>, status: RoomStatus) -> Self {
        Self {
            id: id.into(),
            status,
            members: Vec::new(),
            last_event: None,
        }
    }
}

/// Everything the client persists between syncs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    /// The live account session, if logged in.
    #[serde(default)]
    pub session: Option<Session>,
    /// Cursor of the last fully processed sync response.
    #[serde(default)]
    pub sync_token: Option<String>,
    /// Room table keyed by room id.
    #[serde(default)]
    pub rooms: HashMap<String, Room>,
    /// Monotonic counter backing outbound transaction ids.
    #[serde(default)]
    pub transaction_counter: u64,
}

/// A partial update merged into [`ClientState`].
///
/// Absent fields leave the corresponding state untouched. The room table is
/// replaced as a whole, never patched room-by-room, so one sync iteration's
/// reconciliation lands atomically.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    session: Option<Session>,
    sync_token: Option<String>,
    rooms: Option<HashMap<String, Room>>,
    transaction_counter: Option<u64>,
}

impl StateUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the session.
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Advances the sync token.
    #[must_use]
    pub fn sync_token(mut self, token: impl Into<String>) -> Self {
        self.sync_token = Some(token.into());
        self
    }

    /// Replaces the room table.
    #[must_use]
    pub fn rooms(mut self, rooms: HashMap<String, Room>) -> Self {
        self.rooms = Some(rooms);
        self
    }

    /// Sets the transaction counter.
    #[must_use]
    pub fn transaction_counter(mut self, counter: u64) -> Self {
        self.transaction_counter = Some(counter);
        self
    }

    /// Returns true if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.session.is_none()
            && self.sync_token.is_none()
            && self.rooms.is_none()
            && self.transaction_counter.is_none()
    }

    /// Merges this update into `state`.
    ///
    /// Store implementations call this under their internal lock so a single
    /// update is always observed in full or not at all.
    pub fn apply_to(&self, state: &mut ClientState) {
        if let Some(ref session) = self.session {
            state.session = Some(session.clone());
        }
        if let Some(ref token) = self.sync_token {
            state.sync_token = Some(token.clone());
        }
        if let Some(ref rooms) = self.rooms {
            state.rooms = rooms.clone();
        }
        if let Some(counter) = self.transaction_counter {
            state.transaction_counter = counter;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: "@me:node.example.com".into(),
            access_token: "token".into(),
            home_server: "node.example.com".into(),
            device_id: "device".into(),
        }
    }

    #[test]
    fn allowed_transitions() {
        assert!(RoomStatus::Invited.can_transition_to(RoomStatus::Joined));
        assert!(RoomStatus::Invited.can_transition_to(RoomStatus::Left));
        assert!(RoomStatus::Joined.can_transition_to(RoomStatus::Left));
    }

    #[test]
    fn forbidden_transitions() {
        assert!(!RoomStatus::Left.can_transition_to(RoomStatus::Joined));
        assert!(!RoomStatus::Left.can_transition_to(RoomStatus::Invited));
        assert!(!RoomStatus::Joined.can_transition_to(RoomStatus::Invited));
        assert!(!RoomStatus::Joined.can_transition_to(RoomStatus::Joined));
        assert!(!RoomStatus::Invited.can_transition_to(RoomStatus::Invited));
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut state = ClientState {
            session: Some(session()),
            sync_token: Some("s1".into()),
            rooms: HashMap::new(),
            transaction_counter: 7,
        };

        StateUpdate::new().sync_token("s2").apply_to(&mut state);

        assert_eq!(state.sync_token.as_deref(), Some("s2"));
        assert_eq!(state.transaction_counter, 7);
        assert!(state.session.is_some());
    }

    #[test]
    fn update_replaces_room_table_wholesale() {
        let mut state = ClientState::default();
        state
            .rooms
            .insert("!old:hs".into(), Room::new("!old:hs", RoomStatus::Joined));

        let mut table = HashMap::new();
        table.insert("!new:hs".into(), Room::new("!new:hs", RoomStatus::Invited));
        StateUpdate::new().rooms(table).apply_to(&mut state);

        assert!(!state.rooms.contains_key("!old:hs"));
        assert!(state.rooms.contains_key("!new:hs"));
    }

    #[test]
    fn empty_update_is_empty() {
        assert!(StateUpdate::new().is_empty());
        assert!(!StateUpdate::new().transaction_counter(1).is_empty());
    }

    #[test]
    fn state_snapshot_roundtrips_through_json() {
        let mut state = ClientState::default();
        state.session = Some(session());
        state
            .rooms
            .insert("!a:hs".into(), Room::new("!a:hs", RoomStatus::Invited));
        state.transaction_counter = 3;

        let json = serde_json::to_string(&state).unwrap();
        let decoded: ClientState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);
    }
}
