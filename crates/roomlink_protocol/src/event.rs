//! Room event types.

use serde::{Deserialize, Serialize};

/// Event type of a text or media message posted to a room.
pub const ROOM_MESSAGE: &str = "m.room.message";

/// Event type of a membership change (invite, join, leave).
pub const ROOM_MEMBER: &str = "m.room.member";

/// A full event from a joined or left room's state or timeline section.
///
/// Only the fields the client interprets are typed; `content` stays a raw
/// JSON value because its shape depends on `event_type`. Use
/// [`RoomEvent::message_content`] and [`RoomEvent::membership`] to project it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Event type, e.g. `m.room.message` or `m.room.member`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Fully qualified id of the user that emitted the event.
    pub sender: String,
    /// Server-assigned event id. Absent on stripped/synthetic events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Event payload; shape depends on `event_type`.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Server timestamp in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_server_ts: Option<u64>,
    /// State key for state events. For membership events this is the
    /// affected user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

impl RoomEvent {
    /// Returns true if this is a message event.
    pub fn is_message(&self) -> bool {
        self.event_type == ROOM_MESSAGE
    }

    /// Returns true if this is a membership event.
    pub fn is_member(&self) -> bool {
        self.event_type == ROOM_MEMBER
    }

    /// Projects the content as a message body, if this is a message event
    /// with well-formed content.
    pub fn message_content(&self) -> Option<MessageContent> {
        if !self.is_message() {
            return None;
        }
        serde_json::from_value(self.content.clone()).ok()
    }

    /// Projects the membership change carried by this event, if any.
    pub fn membership(&self) -> Option<Membership> {
        if !self.is_member() {
            return None;
        }
        self.content
            .get("membership")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
    }
}

/// A reduced state event delivered for rooms the user is invited to.
///
/// Invited rooms only expose stripped state: no event id, no timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrippedStateEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Fully qualified id of the user that emitted the event.
    pub sender: String,
    /// State key; for membership events the affected user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Event payload.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl StrippedStateEvent {
    /// Projects the membership change carried by this event, if any.
    pub fn membership(&self) -> Option<Membership> {
        if self.event_type != ROOM_MEMBER {
            return None;
        }
        self.content
            .get("membership")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
    }
}

/// Membership value carried by an `m.room.member` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// User has been invited.
    Invite,
    /// User has joined.
    Join,
    /// User has left (or declined an invite).
    Leave,
    /// User has been banned.
    Ban,
}

/// Content of an `m.room.message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message type, e.g. `m.text`.
    pub msgtype: String,
    /// Opaque message body. End-to-end payload handling is out of scope for
    /// the client; bodies pass through untouched.
    pub body: String,
}
