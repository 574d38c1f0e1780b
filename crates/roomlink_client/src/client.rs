//! Client facade composing the sync engine components.

use crate::auth::AuthorizationGuard;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::event::{ClientEvent, ClientEventKind};
use crate::router::{EventRouter, SubscriptionId};
use crate::sync::{Credentials, SyncLoop, SyncState, SyncStats};
use crate::transport::{Method, Transport};
use crate::txn::TransactionSequencer;
use parking_lot::Mutex;
use roomlink_protocol::{InviteRequest, JoinResponse, SendEventResponse, TextMessage};
use roomlink_store::{Room, RoomStatus, StateStore};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// The public client surface.
///
/// A client owns one sync loop and exposes room accessors, messaging and
/// membership actions, and event subscriptions. Its collaborators (the
/// transport and the state store) are injected at construction, so tests
/// build a client over fakes directly.
///
/// # Example
///
/// ```rust,ignore
/// let client = Client::new(ClientConfig::new(), HttpTransport::new(url), FileStore::open(path)?);
/// client.subscribe(ClientEventKind::Message, |event| println!("{event:?}"));
/// client.start(&Credentials::new(id, password, device_id))?;
/// ```
pub struct Client<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    guard: AuthorizationGuard<S>,
    sequencer: TransactionSequencer<S>,
    router: Arc<EventRouter>,
    sync_loop: Arc<SyncLoop<T, S>>,
    poll_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<T, S> Client<T, S>
where
    T: Transport + 'static,
    S: StateStore + 'static,
{
    /// Creates a client over the injected transport and store.
    pub fn new(config: ClientConfig, transport: T, store: S) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let router = Arc::new(EventRouter::new());
        let sync_loop = Arc::new(SyncLoop::new(
            config,
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&router),
        ));

        Self {
            guard: AuthorizationGuard::new(Arc::clone(&store)),
            sequencer: TransactionSequencer::new(Arc::clone(&store)),
            transport,
            store,
            router,
            sync_loop,
            poll_thread: Mutex::new(None),
        }
    }

    /// Logs in, performs the first sync, and begins polling in the
    /// background.
    ///
    /// Control returns after exactly one login call and one (retried if
    /// necessary) sync call; subsequent iterations run on a dedicated
    /// thread. Fails without starting the thread if login or the first sync
    /// fail terminally.
    pub fn start(&self, credentials: &Credentials) -> ClientResult<()> {
        self.sync_loop.start(credentials)?;

        // Reap a thread left over from a previous run, then spawn the next.
        if let Some(handle) = self.poll_thread.lock().take() {
            let _ = handle.join();
        }
        let sync_loop = Arc::clone(&self.sync_loop);
        let handle = thread::Builder::new()
            .name("roomlink-sync".into())
            .spawn(move || sync_loop.run())?;
        *self.poll_thread.lock() = Some(handle);

        debug!("client started");
        Ok(())
    }

    /// Stops the polling loop.
    ///
    /// Idempotent. An iteration already awaiting the server completes first
    /// (and its cursor advance is honored); this call blocks until the loop
    /// thread has exited.
    pub fn stop(&self) {
        self.sync_loop.request_stop();
        if let Some(handle) = self.poll_thread.lock().take() {
            let _ = handle.join();
        }
        debug!("client stopped");
    }

    /// Returns the sync loop state.
    pub fn sync_state(&self) -> SyncState {
        self.sync_loop.state()
    }

    /// Returns the sync loop statistics.
    pub fn stats(&self) -> SyncStats {
        self.sync_loop.stats()
    }

    /// Returns all rooms the user has joined. Empty when none match.
    pub fn joined_rooms(&self) -> ClientResult<Vec<Room>> {
        self.rooms_with_status(RoomStatus::Joined)
    }

    /// Returns all rooms the user is invited to. Empty when none match.
    pub fn invited_rooms(&self) -> ClientResult<Vec<Room>> {
        self.rooms_with_status(RoomStatus::Invited)
    }

    /// Returns all rooms the user has left. Empty when none match.
    pub fn left_rooms(&self) -> ClientResult<Vec<Room>> {
        self.rooms_with_status(RoomStatus::Left)
    }

    /// Returns the room record with the given id, if known.
    pub fn room_by_id(&self, room_id: &str) -> ClientResult<Option<Room>> {
        Ok(self.store.room(room_id)?)
    }

    /// Sends a text message to a room.
    ///
    /// The transaction id is allocated (and its counter persisted) before
    /// the authorization check and the network call. A failed send burns its
    /// id: a retry allocates a fresh one, and the server deduplicates any
    /// request that does reach it twice under the same id.
    ///
    /// Returns the event id the server assigned.
    pub fn send_text_message(&self, room_id: &str, body: &str) -> ClientResult<String> {
        let room_id = self.resolve_room_id(room_id)?;
        let txn_id = self.sequencer.next_id()?;

        self.guard.with_authorization("send_text_message", |token| {
            let message = serde_json::to_value(TextMessage::new(body))
                .map_err(|e| crate::error::ClientError::Protocol(e.to_string()))?;
            let path = format!("/rooms/{room_id}/send/m.room.message/{txn_id}");
            let response = self
                .transport
                .call(Method::Put, &path, Some(token), Some(&message))?;
            let sent: SendEventResponse = serde_json::from_value(response)
                .map_err(|e| crate::error::ClientError::Protocol(e.to_string()))?;
            Ok(sent.event_id)
        })
    }

    /// Joins the given rooms.
    ///
    /// One authorization check covers the whole batch. Ids without a stored
    /// room record are not an error; the join proceeds against the raw id.
    pub fn join_rooms(&self, room_ids: &[&str]) -> ClientResult<()> {
        self.guard.with_authorization("join_rooms", |token| {
            for id in room_ids {
                let target = self.resolve_room_id(id)?;
                let path = format!("/rooms/{target}/join");
                let response = self.transport.call(
                    Method::Post,
                    &path,
                    Some(token),
                    Some(&serde_json::json!({})),
                )?;
                let _joined: JoinResponse = serde_json::from_value(response)
                    .map_err(|e| crate::error::ClientError::Protocol(e.to_string()))?;
            }
            Ok(())
        })
    }

    /// Invites a user to the given rooms.
    ///
    /// One authorization check covers the whole batch; each room gets its
    /// own invite call.
    pub fn invite_to_rooms(&self, user_id: &str, room_ids: &[&str]) -> ClientResult<()> {
        self.guard.with_authorization("invite_to_rooms", |token| {
            let body = serde_json::to_value(InviteRequest {
                user_id: user_id.to_string(),
            })
            .map_err(|e| crate::error::ClientError::Protocol(e.to_string()))?;

            for id in room_ids {
                let target = self.resolve_room_id(id)?;
                let path = format!("/rooms/{target}/invite");
                self.transport
                    .call(Method::Post, &path, Some(token), Some(&body))?;
            }
            Ok(())
        })
    }

    /// Registers a handler for one event kind.
    pub fn subscribe<F>(&self, kind: ClientEventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.router.subscribe(kind, handler)
    }

    /// Removes exactly the handler registered under `id`.
    pub fn unsubscribe(&self, kind: ClientEventKind, id: SubscriptionId) -> bool {
        self.router.unsubscribe(kind, id)
    }

    /// Removes every handler for `kind`.
    pub fn unsubscribe_all(&self, kind: ClientEventKind) -> usize {
        self.router.unsubscribe_all(kind)
    }

    /// Resolves a room id through the stored room table, falling back to the
    /// raw id when the room is unknown (member actions are best-effort).
    fn resolve_room_id(&self, room_id: &str) -> ClientResult<String> {
        Ok(self
            .store
            .room(room_id)?
            .map_or_else(|| room_id.to_string(), |room| room.id))
    }

    fn rooms_with_status(&self, status: RoomStatus) -> ClientResult<Vec<Room>> {
        Ok(self
            .store
            .rooms()?
            .into_values()
            .filter(|room| room.status == status)
            .collect())
    }
}

impl<T, S> Drop for Client<T, S> {
    fn drop(&mut self) {
        // Signal the loop and detach its thread; it exits after the current
        // iteration. Joining here could block a drop for a full long-poll.
        self.sync_loop.request_stop();
        drop(self.poll_thread.lock().take());
    }
}
