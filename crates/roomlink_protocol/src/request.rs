//! Request and response bodies for room actions.

use serde::{Deserialize, Serialize};

/// Message type for plain text messages.
pub const MSGTYPE_TEXT: &str = "m.text";

/// Body of a `PUT /rooms/{roomId}/send/m.room.message/{txnId}` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// Message type; always `m.text` for this client.
    pub msgtype: String,
    /// Opaque message body.
    pub body: String,
}

impl TextMessage {
    /// Creates a plain text message body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            msgtype: MSGTYPE_TEXT.to_string(),
            body: body.into(),
        }
    }
}

/// Response to a send call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEventResponse {
    /// Id the homeserver assigned to the accepted event.
    pub event_id: String,
}

/// Body of a `POST /rooms/{roomId}/invite` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    /// Fully qualified id of the user to invite.
    pub user_id: String,
}

/// Response to a `POST /rooms/{roomId}/join` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Id of the joined room.
    #[serde(default)]
    pub room_id: String,
}
