//! Sync loop state machine.
//!
//! The loop owns the client's view of the server event stream: it issues
//! authenticated long-poll sync calls, reconciles room state, dispatches
//! typed events and advances the persisted cursor. It is the only writer of
//! the cursor and the room table, and the only caller of the event router
//! for inbound events.

use crate::auth::AuthorizationGuard;
use crate::config::{ClientConfig, RetryDecision};
use crate::error::{ClientError, ClientResult};
use crate::reconcile::{apply_room_deltas, deltas_from_sync};
use crate::router::{decode_events, EventRouter};
use crate::transport::{Method, Transport};
use parking_lot::RwLock;
use roomlink_protocol::{LoginRequest, LoginResponse, SyncResponse};
use roomlink_store::{Session, StateStore, StateUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The current state of the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Loop is not running.
    Stopped,
    /// Login and the first sync are in progress.
    Starting,
    /// Loop is iterating normally.
    Running,
    /// The last attempt failed; the loop is waiting out a backoff delay.
    Retrying,
    /// The retry budget is exhausted. Terminal until started again.
    Failed,
}

impl SyncState {
    /// Returns true if the loop may be started from this state.
    pub fn can_start(self) -> bool {
        matches!(self, SyncState::Stopped | SyncState::Failed)
    }

    /// Returns true if the loop is processing or waiting to process.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SyncState::Starting | SyncState::Running | SyncState::Retrying
        )
    }
}

/// Statistics about the sync loop.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successfully processed sync iterations.
    pub iterations_completed: u64,
    /// Client events dispatched to subscribers.
    pub events_dispatched: u64,
    /// Retries performed after transient failures.
    pub retries: u64,
    /// Message of the error that last halted or delayed the loop.
    pub last_error: Option<String>,
}

/// Credentials passed to [`SyncLoop::start`].
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account identifier on the homeserver.
    pub id: String,
    /// Account password.
    pub password: String,
    /// Stable device identifier for this installation.
    pub device_id: String,
}

impl Credentials {
    /// Creates a credentials record.
    pub fn new(
        id: impl Into<String>,
        password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
            device_id: device_id.into(),
        }
    }
}

/// The long-poll loop driving room reconciliation and event dispatch.
///
/// One instance exists per client. Callers normally drive it through the
/// client facade, which runs [`SyncLoop::run`] on a background thread;
/// [`SyncLoop::sync_once`] is public so tests can step iterations by hand.
pub struct SyncLoop<T, S> {
    config: ClientConfig,
    transport: Arc<T>,
    store: Arc<S>,
    guard: AuthorizationGuard<S>,
    router: Arc<EventRouter>,
    state: RwLock<SyncState>,
    stop_requested: AtomicBool,
    stats: RwLock<SyncStats>,
}

impl<T, S> SyncLoop<T, S> {
    /// Returns the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Returns a copy of the loop statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Signals the loop to cease scheduling further iterations.
    ///
    /// Idempotent. An iteration already in flight completes normally and its
    /// cursor advance is honored; only the *next* iteration is prevented.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn record_failure(&self, error: &ClientError) {
        self.set_state(SyncState::Failed);
        self.stats.write().last_error = Some(error.to_string());
    }
}

impl<T: Transport, S: StateStore> SyncLoop<T, S> {
    /// Creates a new sync loop over the injected collaborators.
    pub fn new(
        config: ClientConfig,
        transport: Arc<T>,
        store: Arc<S>,
        router: Arc<EventRouter>,
    ) -> Self {
        Self {
            config,
            transport,
            guard: AuthorizationGuard::new(Arc::clone(&store)),
            store,
            router,
            state: RwLock::new(SyncState::Stopped),
            stop_requested: AtomicBool::new(false),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Logs in and performs the first sync.
    ///
    /// Exactly one login call is issued; login failures are surfaced
    /// directly, never retried. The first sync carries no cursor (full
    /// sync) and runs under the normal retry policy. On success the loop is
    /// left in [`SyncState::Running`], ready for [`SyncLoop::run`].
    pub fn start(&self, credentials: &Credentials) -> ClientResult<()> {
        if !self.state().can_start() {
            return Err(ClientError::InvalidState {
                state: format!("{:?}", self.state()),
            });
        }

        self.set_state(SyncState::Starting);
        self.stop_requested.store(false, Ordering::SeqCst);

        if let Err(e) = self.login(credentials) {
            self.record_failure(&e);
            return Err(e);
        }

        self.sync_with_retry()?;
        Ok(())
    }

    /// Repeats sync iterations until stopped or failed.
    ///
    /// Intended to run on a dedicated thread after [`SyncLoop::start`]
    /// succeeded. Returns when a stop was requested (state
    /// [`SyncState::Stopped`]) or the retry budget was exhausted (state
    /// [`SyncState::Failed`]).
    pub fn run(&self) {
        while !self.stop_requested.load(Ordering::SeqCst) {
            if let Err(e) = self.sync_with_retry() {
                error!(error = %e, "sync loop halted");
                return;
            }
        }
        debug!("sync loop stopped on request");
        self.set_state(SyncState::Stopped);
    }

    /// Performs one sync iteration.
    ///
    /// Under the authorization guard: issue the sync call with the current
    /// cursor, reconcile the room table, dispatch decoded events, then
    /// persist the new cursor. A failure anywhere leaves the cursor and the
    /// room table untouched, so the iteration can be repeated without losing
    /// or duplicating state.
    ///
    /// Returns the number of events dispatched.
    pub fn sync_once(&self) -> ClientResult<usize> {
        self.guard.with_authorization("sync", |token| {
            let since = self.store.sync_token()?;
            let path = self.sync_path(since.as_deref());
            let body = self.transport.call(Method::Get, &path, Some(token), None)?;
            let response: SyncResponse = serde_json::from_value(body)
                .map_err(|e| ClientError::Protocol(e.to_string()))?;

            // Reconcile room state before routing events, so handlers
            // observe up-to-date room status.
            let deltas = deltas_from_sync(&response);
            if !deltas.is_empty() {
                let table = apply_room_deltas(&self.store.rooms()?, &deltas);
                self.store.apply(StateUpdate::new().rooms(table))?;
            }

            let events = decode_events(&response);
            for event in &events {
                self.router.dispatch(event);
            }

            // The cursor moves only after the response is fully processed;
            // a crash before this point re-delivers the same events.
            self.store
                .apply(StateUpdate::new().sync_token(response.next_batch))?;

            Ok(events.len())
        })
    }

    /// Performs one iteration under the retry policy.
    ///
    /// Transient failures are retried with backoff against the same cursor.
    /// Exhausting the budget moves the loop to [`SyncState::Failed`] and
    /// returns [`ClientError::RetryExhausted`]; non-retryable failures fail
    /// immediately.
    pub fn sync_with_retry(&self) -> ClientResult<usize> {
        let mut attempt: u32 = 0;

        loop {
            match self.sync_once() {
                Ok(dispatched) => {
                    let mut stats = self.stats.write();
                    stats.iterations_completed += 1;
                    stats.events_dispatched += dispatched as u64;
                    stats.last_error = None;
                    drop(stats);
                    self.set_state(SyncState::Running);
                    return Ok(dispatched);
                }
                Err(ClientError::Transport(e)) => match self.config.retry.decide(attempt, &e) {
                    RetryDecision::RetryAfter(delay) => {
                        warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "sync failed; retrying");
                        self.set_state(SyncState::Retrying);
                        self.stats.write().retries += 1;
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                    RetryDecision::GiveUp => {
                        let err = ClientError::RetryExhausted {
                            attempts: attempt + 1,
                            last: e,
                        };
                        self.record_failure(&err);
                        return Err(err);
                    }
                },
                Err(e) => {
                    self.record_failure(&e);
                    return Err(e);
                }
            }
        }
    }

    fn login(&self, credentials: &Credentials) -> ClientResult<()> {
        let request = LoginRequest::new(
            &credentials.id,
            &credentials.password,
            &credentials.device_id,
        );
        let body = serde_json::to_value(&request).map_err(|e| ClientError::Protocol(e.to_string()))?;

        let response = self
            .transport
            .call(Method::Post, "/login", None, Some(&body))?;
        let login: LoginResponse =
            serde_json::from_value(response).map_err(|e| ClientError::Protocol(e.to_string()))?;

        debug!(user_id = %login.user_id, "logged in");
        self.store.apply(StateUpdate::new().session(Session {
            user_id: login.user_id,
            access_token: login.access_token,
            home_server: login.home_server,
            device_id: login.device_id,
        }))?;
        Ok(())
    }

    fn sync_path(&self, since: Option<&str>) -> String {
        let timeout = self.config.long_poll_timeout.as_millis();
        match since {
            Some(cursor) => format!("/sync?timeout={timeout}&since={cursor}"),
            None => format!("/sync?timeout={timeout}"),
        }
    }
}
