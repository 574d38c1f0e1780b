//! Room table reconciliation.
//!
//! Each sync response is reduced to one [`RoomDelta`] per touched room, and
//! the deltas are merged into the room table by [`apply_room_deltas`]. The
//! merge is a pure function: the caller replaces the stored table with the
//! result once per sync iteration, so a crash mid-iteration leaves the
//! previous table intact.

use roomlink_protocol::{Membership, RoomEvent, SyncResponse};
use roomlink_store::{Room, RoomStatus};
use std::collections::HashMap;
use tracing::debug;

/// The membership changes a sync response declares for one room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDelta {
    /// Room id.
    pub room_id: String,
    /// Status the server placed this room under.
    pub status: RoomStatus,
    /// Members observed in this response.
    pub members: Vec<String>,
    /// Most recent message event in this response, if any.
    pub last_event: Option<RoomEvent>,
}

impl RoomDelta {
    /// Creates a delta with no members and no message.
    pub fn new(room_id: impl Into<String>, status: RoomStatus) -> Self {
        Self {
            room_id: room_id.into(),
            status,
            members: Vec::new(),
            last_event: None,
        }
    }
}

/// Reduces a sync response to one delta per touched room.
///
/// Members are collected from `m.room.member` join events; the last message
/// event of the timeline becomes the room's `last_event` candidate. Rooms
/// appear in no particular cross-room order (the protocol guarantees none).
pub fn deltas_from_sync(response: &SyncResponse) -> Vec<RoomDelta> {
    let mut deltas = Vec::new();

    for (room_id, joined) in &response.rooms.join {
        let mut delta = RoomDelta::new(room_id.clone(), RoomStatus::Joined);
        collect_members(&joined.state.events, &mut delta.members);
        collect_members(&joined.timeline.events, &mut delta.members);
        delta.last_event = last_message(&joined.timeline.events);
        deltas.push(delta);
    }

    for (room_id, invited) in &response.rooms.invite {
        let mut delta = RoomDelta::new(room_id.clone(), RoomStatus::Invited);
        for event in &invited.invite_state.events {
            if event.membership() == Some(Membership::Join) {
                push_member(&mut delta.members, event.state_key.as_ref(), &event.sender);
            }
        }
        deltas.push(delta);
    }

    for (room_id, left) in &response.rooms.leave {
        let mut delta = RoomDelta::new(room_id.clone(), RoomStatus::Left);
        collect_members(&left.state.events, &mut delta.members);
        collect_members(&left.timeline.events, &mut delta.members);
        delta.last_event = last_message(&left.timeline.events);
        deltas.push(delta);
    }

    deltas
}

/// Merges `deltas` into `table` and returns the updated table.
///
/// - An unknown room is inserted under the delta's declared status, except
///   that a room first seen as Left is dropped.
/// - For a known room, members and the last message merge unconditionally;
///   the status only moves along a legal edge of the transition graph.
/// - A delta demanding an illegal transition is dropped in full. Duplicate
///   deltas are expected from incremental sync and are never an error.
pub fn apply_room_deltas(table: &HashMap<String, Room>, deltas: &[RoomDelta]) -> HashMap<String, Room> {
    let mut next = table.clone();

    for delta in deltas {
        match next.get_mut(&delta.room_id) {
            None => {
                if delta.status == RoomStatus::Left {
                    debug!(room = %delta.room_id, "dropping first-seen left room");
                    continue;
                }
                let mut room = Room::new(delta.room_id.clone(), delta.status);
                for member in &delta.members {
                    if !room.members.contains(member) {
                        room.members.push(member.clone());
                    }
                }
                room.last_event = delta.last_event.clone();
                next.insert(delta.room_id.clone(), room);
            }
            Some(room) => {
                if delta.status != room.status && !room.status.can_transition_to(delta.status) {
                    debug!(
                        room = %delta.room_id,
                        from = ?room.status,
                        to = ?delta.status,
                        "dropping delta with illegal status transition"
                    );
                    continue;
                }

                for member in &delta.members {
                    if !room.members.contains(member) {
                        room.members.push(member.clone());
                    }
                }
                if delta.last_event.is_some() {
                    room.last_event = delta.last_event.clone();
                }
                if delta.status != room.status {
                    room.status = delta.status;
                }
            }
        }
    }

    next
}

fn collect_members(events: &[RoomEvent], members: &mut Vec<String>) {
    for event in events {
        if event.membership() == Some(Membership::Join) {
            push_member(members, event.state_key.as_ref(), &event.sender);
        }
    }
}

fn push_member(members: &mut Vec<String>, state_key: Option<&String>, sender: &str) {
    let member = state_key.map_or(sender, String::as_str);
    if !members.iter().any(|m| m == member) {
        members.push(member.to_string());
    }
}

fn last_message(events: &[RoomEvent]) -> Option<RoomEvent> {
    events.iter().rev().find(|e| e.is_message()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table_with(rooms: &[(&str, RoomStatus)]) -> HashMap<String, Room> {
        rooms
            .iter()
            .map(|(id, status)| ((*id).to_string(), Room::new(*id, *status)))
            .collect()
    }

    #[test]
    fn unknown_room_inserted_with_declared_status() {
        let table = HashMap::new();
        let deltas = vec![
            RoomDelta::new("!a:hs", RoomStatus::Invited),
            RoomDelta::new("!b:hs", RoomStatus::Joined),
        ];

        let next = apply_room_deltas(&table, &deltas);
        assert_eq!(next["!a:hs"].status, RoomStatus::Invited);
        assert_eq!(next["!b:hs"].status, RoomStatus::Joined);
    }

    #[test]
    fn first_seen_left_room_is_dropped() {
        let table = HashMap::new();
        let deltas = vec![RoomDelta::new("!gone:hs", RoomStatus::Left)];

        let next = apply_room_deltas(&table, &deltas);
        assert!(next.is_empty());
    }

    #[test]
    fn legal_transition_applies() {
        let table = table_with(&[("!a:hs", RoomStatus::Invited)]);
        let deltas = vec![RoomDelta::new("!a:hs", RoomStatus::Joined)];

        let next = apply_room_deltas(&table, &deltas);
        assert_eq!(next["!a:hs"].status, RoomStatus::Joined);
    }

    #[test]
    fn illegal_transition_drops_whole_delta() {
        let table = table_with(&[("!a:hs", RoomStatus::Left)]);
        let mut delta = RoomDelta::new("!a:hs", RoomStatus::Joined);
        delta.members = vec!["@alice:hs".into()];

        let next = apply_room_deltas(&table, &[delta]);
        assert_eq!(next["!a:hs"].status, RoomStatus::Left);
        // The delta's members never landed either.
        assert!(next["!a:hs"].members.is_empty());
    }

    #[test]
    fn same_status_delta_still_merges_content() {
        let table = table_with(&[("!a:hs", RoomStatus::Joined)]);
        let mut delta = RoomDelta::new("!a:hs", RoomStatus::Joined);
        delta.members = vec!["@bob:hs".into()];

        let next = apply_room_deltas(&table, &[delta]);
        assert_eq!(next["!a:hs"].status, RoomStatus::Joined);
        assert_eq!(next["!a:hs"].members, vec!["@bob:hs".to_string()]);
    }

    #[test]
    fn members_are_deduplicated_across_deltas() {
        let table = HashMap::new();
        let mut first = RoomDelta::new("!a:hs", RoomStatus::Joined);
        first.members = vec!["@alice:hs".into(), "@bob:hs".into()];
        let mut second = RoomDelta::new("!a:hs", RoomStatus::Joined);
        second.members = vec!["@bob:hs".into(), "@carol:hs".into()];

        let next = apply_room_deltas(&table, &[first, second]);
        assert_eq!(
            next["!a:hs"].members,
            vec![
                "@alice:hs".to_string(),
                "@bob:hs".to_string(),
                "@carol:hs".to_string()
            ]
        );
    }

    #[test]
    fn input_table_is_untouched() {
        let table = table_with(&[("!a:hs", RoomStatus::Invited)]);
        let deltas = vec![RoomDelta::new("!a:hs", RoomStatus::Joined)];

        let _next = apply_room_deltas(&table, &deltas);
        assert_eq!(table["!a:hs"].status, RoomStatus::Invited);
    }

    #[test]
    fn deltas_extracted_from_sync_response() {
        let response: SyncResponse = serde_json::from_value(serde_json::json!({
            "next_batch": "s2",
            "rooms": {
                "join": {
                    "!a:hs": {
                        "state": {"events": [{
                            "type": "m.room.member",
                            "sender": "@alice:hs",
                            "state_key": "@alice:hs",
                            "content": {"membership": "join"}
                        }]},
                        "timeline": {"events": [{
                            "type": "m.room.message",
                            "sender": "@alice:hs",
                            "event_id": "$1",
                            "content": {"msgtype": "m.text", "body": "hi"}
                        }]}
                    }
                },
                "invite": {
                    "!b:hs": {"invite_state": {"events": [{
                        "type": "m.room.member",
                        "sender": "@carol:hs",
                        "state_key": "@carol:hs",
                        "content": {"membership": "join"}
                    }]}}
                }
            }
        }))
        .unwrap();

        let mut deltas = deltas_from_sync(&response);
        deltas.sort_by(|a, b| a.room_id.cmp(&b.room_id));

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].status, RoomStatus::Joined);
        assert_eq!(deltas[0].members, vec!["@alice:hs".to_string()]);
        assert_eq!(
            deltas[0].last_event.as_ref().unwrap().event_id.as_deref(),
            Some("$1")
        );
        assert_eq!(deltas[1].status, RoomStatus::Invited);
        assert_eq!(deltas[1].members, vec!["@carol:hs".to_string()]);
    }

    fn arbitrary_status() -> impl Strategy<Value = RoomStatus> {
        prop_oneof![
            Just(RoomStatus::Invited),
            Just(RoomStatus::Joined),
            Just(RoomStatus::Left),
        ]
    }

    fn rank(status: RoomStatus) -> u8 {
        match status {
            RoomStatus::Invited => 0,
            RoomStatus::Joined => 1,
            RoomStatus::Left => 2,
        }
    }

    proptest! {
        /// Whatever delta sequence arrives, a room's status never moves
        /// backwards along Invited → Joined → Left.
        #[test]
        fn status_never_regresses(
            statuses in proptest::collection::vec(arbitrary_status(), 1..40)
        ) {
            let mut table: HashMap<String, Room> = HashMap::new();
            let mut observed = Vec::new();

            for status in statuses {
                let deltas = vec![RoomDelta::new("!room:hs", status)];
                table = apply_room_deltas(&table, &deltas);
                if let Some(room) = table.get("!room:hs") {
                    observed.push(room.status);
                }
            }

            for pair in observed.windows(2) {
                prop_assert!(rank(pair[0]) <= rank(pair[1]));
            }
        }
    }
}
