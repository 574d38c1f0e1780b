//! Authorization guard for authenticated operations.

use crate::error::{ClientError, ClientResult};
use roomlink_store::StateStore;
use std::sync::Arc;
use tracing::debug;

/// Gate that every authenticated operation passes through.
///
/// The guard reads the persisted session on every call and never caches the
/// token, so a session rotated between calls is picked up by the next one. A
/// token rotated while a call is in flight simply fails that call at the
/// server; there is no silent gap.
pub struct AuthorizationGuard<S> {
    store: Arc<S>,
}

impl<S: StateStore> AuthorizationGuard<S> {
    /// Creates a guard over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Runs `f` with the stored access token.
    ///
    /// Fails with [`ClientError::Unauthorized`] naming `operation` when no
    /// session is stored; `f` is not invoked and no network call happens.
    pub fn with_authorization<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&str) -> ClientResult<T>,
    ) -> ClientResult<T> {
        match self.store.session()? {
            Some(session) => f(&session.access_token),
            None => {
                debug!(operation, "rejected: no stored session");
                Err(ClientError::Unauthorized { operation })
            }
        }
    }
}
