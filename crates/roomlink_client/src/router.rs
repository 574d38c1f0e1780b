//! Event decoding and subscriber dispatch.

use crate::event::{ClientEvent, ClientEventKind, InviteEvent, MembershipChange, MessageEvent};
use parking_lot::RwLock;
use roomlink_protocol::{Membership, SyncResponse};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Identifies one registered handler.
///
/// Returned by [`EventRouter::subscribe`]; removing a single handler happens
/// by id, which keeps "remove one" and "remove all" observably distinct
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Decodes sync responses into typed client events and dispatches them to
/// subscribers.
///
/// Handlers for one event kind run synchronously in registration order. A
/// panicking handler is caught and logged; it never blocks the remaining
/// handlers or events.
#[derive(Default)]
pub struct EventRouter {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<ClientEventKind, Vec<(SubscriptionId, Handler)>>>,
}

impl EventRouter {
    /// Creates a router with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event kind.
    pub fn subscribe<F>(&self, kind: ClientEventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes exactly the handler registered under `id`.
    ///
    /// Returns true if a handler was removed. Other handlers for the same
    /// kind keep firing.
    pub fn unsubscribe(&self, kind: ClientEventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(registered, _)| *registered != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Removes every handler for `kind`. Handlers of other kinds are
    /// untouched.
    ///
    /// Returns the number of handlers removed.
    pub fn unsubscribe_all(&self, kind: ClientEventKind) -> usize {
        self.handlers
            .write()
            .remove(&kind)
            .map_or(0, |list| list.len())
    }

    /// Returns the number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: ClientEventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Invokes every handler registered for the event's kind, in
    /// registration order.
    pub fn dispatch(&self, event: &ClientEvent) {
        // Handlers are cloned out so a handler that (un)subscribes does not
        // deadlock against the registry lock.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(kind = ?event.kind(), room = %event.room_id(), "subscriber panicked; continuing");
            }
        }
    }
}

/// Decodes a sync response into client events.
///
/// Events within one room keep the server's order (state before timeline);
/// rooms are processed in the order the response presents them, with no
/// cross-room ordering guarantee.
pub fn decode_events(response: &SyncResponse) -> Vec<ClientEvent> {
    let mut events = Vec::new();

    for (room_id, joined) in &response.rooms.join {
        for event in joined.state.events.iter().chain(&joined.timeline.events) {
            decode_room_event(room_id, event, &mut events);
        }
    }

    for (room_id, invited) in &response.rooms.invite {
        for event in &invited.invite_state.events {
            if event.membership() == Some(Membership::Invite) {
                events.push(ClientEvent::Invite(InviteEvent {
                    room_id: room_id.clone(),
                    sender: event.sender.clone(),
                }));
            }
        }
    }

    for (room_id, left) in &response.rooms.leave {
        for event in left.state.events.iter().chain(&left.timeline.events) {
            decode_room_event(room_id, event, &mut events);
        }
    }

    events
}

fn decode_room_event(
    room_id: &str,
    event: &roomlink_protocol::RoomEvent,
    out: &mut Vec<ClientEvent>,
) {
    if let Some(content) = event.message_content() {
        out.push(ClientEvent::Message(MessageEvent {
            room_id: room_id.to_string(),
            sender: event.sender.clone(),
            body: content.body,
            event_id: event.event_id.clone(),
            origin_server_ts: event.origin_server_ts,
        }));
        return;
    }

    let user_id = event
        .state_key
        .clone()
        .unwrap_or_else(|| event.sender.clone());
    match event.membership() {
        Some(Membership::Join) => out.push(ClientEvent::Join(MembershipChange {
            room_id: room_id.to_string(),
            user_id,
        })),
        Some(Membership::Leave) => out.push(ClientEvent::Leave(MembershipChange {
            room_id: room_id.to_string(),
            user_id,
        })),
        // Invites surface through the invite section; bans and malformed
        // membership values carry no client event.
        _ => {}
    }
}
