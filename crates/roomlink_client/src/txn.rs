//! Transaction id sequencer for idempotent sends.

use crate::error::ClientResult;
use parking_lot::Mutex;
use roomlink_store::{StateStore, StateUpdate};
use std::sync::Arc;
use std::time::SystemTime;

/// Prefix shared by all transaction ids.
const TXN_PREFIX: &str = "m";

/// Allocates collision-free identifiers for outbound messages.
///
/// Ids have the form `m{counter}.{millis}`: the persisted counter value at
/// allocation time plus a clock suffix. The server deduplicates retried
/// sends on this id, so a caller that retries a failed send with the same id
/// cannot produce a duplicate message.
///
/// The read-increment-persist sequence runs under a lock: concurrent
/// allocations always observe distinct counter values.
pub struct TransactionSequencer<S> {
    store: Arc<S>,
    lock: Mutex<()>,
}

impl<S: StateStore> TransactionSequencer<S> {
    /// Creates a sequencer over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Allocates the next transaction id and persists the incremented
    /// counter.
    ///
    /// The counter is committed before the id is handed out, so an id is
    /// never reissued even if the send it was allocated for fails.
    pub fn next_id(&self) -> ClientResult<String> {
        let _guard = self.lock.lock();
        let counter = self.store.transaction_counter()?;
        self.store
            .apply(StateUpdate::new().transaction_counter(counter + 1))?;
        Ok(format!("{TXN_PREFIX}{counter}.{}", clock_millis()))
    }
}

/// Milliseconds since the epoch, used as the id's uniqueness suffix.
fn clock_millis() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
