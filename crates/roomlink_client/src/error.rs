//! Error types for client operations.

use crate::transport::TransportError;
use roomlink_store::StoreError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An authenticated operation was attempted without a stored session.
    ///
    /// Raised before any network call is made and never retried.
    #[error("`{operation}` requires a logged-in session")]
    Unauthorized {
        /// Name of the rejected operation, for diagnostics.
        operation: &'static str,
    },

    /// The transport call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The state store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The server response did not match the expected shape.
    #[error("malformed server response: {0}")]
    Protocol(String),

    /// The sync loop exhausted its retry budget.
    ///
    /// Terminal: the loop halts and produces no further events until the
    /// client is started again.
    #[error("sync abandoned after {attempts} attempts")]
    RetryExhausted {
        /// Total sync attempts made, including the initial one.
        attempts: u32,
        /// The failure that ended the last attempt.
        #[source]
        last: TransportError,
    },

    /// The sync loop is already active.
    #[error("cannot start sync from state {state}")]
    InvalidState {
        /// The state the loop was in.
        state: String,
    },

    /// Spawning the polling thread failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns true if retrying the same call may succeed.
    ///
    /// Only transport-level failures are ever retryable; authorization and
    /// protocol failures are not resolved by waiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}
