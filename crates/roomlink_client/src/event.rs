//! Typed client events.
//!
//! Inbound protocol payloads are decoded into this closed union by the event
//! router; callers never construct these themselves.

/// Kind discriminant used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEventKind {
    /// A text message arrived in a joined room.
    Message,
    /// The user was invited to a room.
    Invite,
    /// A user joined a room.
    Join,
    /// A user left a room.
    Leave,
}

/// An event produced by the sync engine for subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A text message arrived in a joined room.
    Message(MessageEvent),
    /// The user was invited to a room.
    Invite(InviteEvent),
    /// A user joined a room.
    Join(MembershipChange),
    /// A user left a room.
    Leave(MembershipChange),
}

impl ClientEvent {
    /// Returns the kind discriminant of this event.
    pub fn kind(&self) -> ClientEventKind {
        match self {
            ClientEvent::Message(_) => ClientEventKind::Message,
            ClientEvent::Invite(_) => ClientEventKind::Invite,
            ClientEvent::Join(_) => ClientEventKind::Join,
            ClientEvent::Leave(_) => ClientEventKind::Leave,
        }
    }

    /// Returns the id of the room this event belongs to.
    pub fn room_id(&self) -> &str {
        match self {
            ClientEvent::Message(e) => &e.room_id,
            ClientEvent::Invite(e) => &e.room_id,
            ClientEvent::Join(e) | ClientEvent::Leave(e) => &e.room_id,
        }
    }
}

/// A text message received in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Room the message was posted to.
    pub room_id: String,
    /// Sender's user id.
    pub sender: String,
    /// Opaque message body.
    pub body: String,
    /// Server-assigned event id, when available.
    pub event_id: Option<String>,
    /// Server timestamp in milliseconds, when available.
    pub origin_server_ts: Option<u64>,
}

/// An invitation into a room.
#[derive(Debug, Clone, PartialEq)]
pub struct InviteEvent {
    /// Room the user is invited to.
    pub room_id: String,
    /// User that sent the invite.
    pub sender: String,
}

/// A membership change observed in a room.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipChange {
    /// Room where the membership changed.
    pub room_id: String,
    /// The user whose membership changed.
    pub user_id: String,
}
