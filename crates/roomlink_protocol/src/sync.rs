//! The `/sync` response shape.
//!
//! A sync response carries the cursor for the next incremental call and the
//! per-room event sets that accumulated since the previous cursor. Servers
//! omit sections with no data; every container here defaults to empty so a
//! minimal `{"next_batch": "..."}` body decodes cleanly.

use crate::event::{RoomEvent, StrippedStateEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a `GET /sync` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Cursor to pass as `since` on the next sync call.
    #[serde(default)]
    pub next_batch: String,
    /// Per-room event sets grouped by the client's membership.
    #[serde(default)]
    pub rooms: RoomSections,
}

/// Room updates grouped by membership status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSections {
    /// Rooms the user has joined, keyed by room id.
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
    /// Rooms the user has been invited to, keyed by room id.
    #[serde(default)]
    pub invite: HashMap<String, InvitedRoom>,
    /// Rooms the user has left, keyed by room id.
    #[serde(default)]
    pub leave: HashMap<String, LeftRoom>,
}

impl RoomSections {
    /// Returns true if no room is touched by this response.
    pub fn is_empty(&self) -> bool {
        self.join.is_empty() && self.invite.is_empty() && self.leave.is_empty()
    }
}

/// Updates for a single joined room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedRoom {
    /// State events current at the start of the timeline.
    #[serde(default)]
    pub state: State,
    /// Ordered message and state events since the previous cursor.
    #[serde(default)]
    pub timeline: Timeline,
}

/// Updates for a single invited room. Only stripped state is available
/// before joining.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvitedRoom {
    /// Stripped state events describing the invite.
    #[serde(default)]
    pub invite_state: InviteState,
}

/// Updates for a single left room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeftRoom {
    /// State events up to the point of leaving.
    #[serde(default)]
    pub state: State,
    /// Timeline events up to the point of leaving.
    #[serde(default)]
    pub timeline: Timeline,
}

/// A list of full state events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Events in server order.
    #[serde(default)]
    pub events: Vec<RoomEvent>,
}

/// An ordered slice of a room's event timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Events in server order.
    #[serde(default)]
    pub events: Vec<RoomEvent>,
    /// True if the server truncated the timeline for this response.
    #[serde(default)]
    pub limited: bool,
    /// Cursor for paginating backwards from the start of this slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_batch: Option<String>,
}

/// A list of stripped state events for an invited room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InviteState {
    /// Events in server order.
    #[serde(default)]
    pub events: Vec<StrippedStateEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_response_decodes() {
        let response: SyncResponse =
            serde_json::from_value(json!({"next_batch": "s793973_746830"})).unwrap();

        assert_eq!(response.next_batch, "s793973_746830");
        assert!(response.rooms.is_empty());
    }

    #[test]
    fn full_response_decodes() {
        let response: SyncResponse = serde_json::from_value(json!({
            "next_batch": "s100_200",
            "rooms": {
                "join": {
                    "!room-a:node.example.com": {
                        "state": {
                            "events": [{
                                "type": "m.room.member",
                                "sender": "@alice:node.example.com",
                                "state_key": "@alice:node.example.com",
                                "content": {"membership": "join"}
                            }]
                        },
                        "timeline": {
                            "events": [{
                                "type": "m.room.message",
                                "sender": "@alice:node.example.com",
                                "event_id": "$1",
                                "content": {"msgtype": "m.text", "body": "first"}
                            }, {
                                "type": "m.room.message",
                                "sender": "@alice:node.example.com",
                                "event_id": "$2",
                                "content": {"msgtype": "m.text", "body": "second"}
                            }],
                            "limited": false,
                            "prev_batch": "p50"
                        }
                    }
                },
                "invite": {
                    "!room-b:node.example.com": {
                        "invite_state": {
                            "events": [{
                                "type": "m.room.member",
                                "sender": "@alice:node.example.com",
                                "state_key": "@me:node.example.com",
                                "content": {"membership": "invite"}
                            }]
                        }
                    }
                },
                "leave": {}
            }
        }))
        .unwrap();

        assert_eq!(response.rooms.join.len(), 1);
        assert_eq!(response.rooms.invite.len(), 1);
        assert!(response.rooms.leave.is_empty());

        let joined = &response.rooms.join["!room-a:node.example.com"];
        assert_eq!(joined.timeline.events.len(), 2);
        // Server order within a room is preserved by the Vec.
        assert_eq!(joined.timeline.events[0].event_id.as_deref(), Some("$1"));
        assert_eq!(joined.timeline.events[1].event_id.as_deref(), Some("$2"));
        assert_eq!(joined.timeline.prev_batch.as_deref(), Some("p50"));
    }

    #[test]
    fn unknown_sections_are_ignored() {
        // Servers send sections this client does not consume.
        let response: SyncResponse = serde_json::from_value(json!({
            "next_batch": "s1",
            "account_data": {"events": []},
            "presence": {"events": []},
            "device_one_time_keys_count": {},
            "rooms": {"join": {}, "invite": {}, "leave": {}}
        }))
        .unwrap();

        assert_eq!(response.next_batch, "s1");
        assert!(response.rooms.is_empty());
    }

    #[test]
    fn room_without_timeline_defaults_empty() {
        let response: SyncResponse = serde_json::from_value(json!({
            "next_batch": "s2",
            "rooms": {"join": {"!a:hs": {"state": {"events": []}}}}
        }))
        .unwrap();

        let joined = &response.rooms.join["!a:hs"];
        assert!(joined.timeline.events.is_empty());
        assert!(!joined.timeline.limited);
    }
}
