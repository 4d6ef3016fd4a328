// src/error.rs
use thiserror::Error;
use tracing::{error, warn};

/// Failures a balance or association query can return.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// The database failed to answer. The caller decides whether to retry.
    #[error("storage unavailable while {operation}: {source}")]
    StorageUnavailable {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored aggregate could not be decoded. Only the current query is aborted.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// The requested timestamp precedes the first balance snapshot.
    #[error("ledger not yet initialized: no balance snapshot at or before {timestamp}")]
    LedgerNotYetInitialized { timestamp: i64 },
}

impl BalanceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BalanceError::StorageUnavailable { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        BalanceError::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Rejected `shard.realm.num` identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entity id {value:?}: {reason}")]
pub struct EntityIdError {
    pub value: String,
    pub reason: &'static str,
}

pub type BalanceResult<T> = Result<T, BalanceError>;

/// Maps a rusqlite failure to a `BalanceError`, logging it once here.
///
/// An aggregate that overflows i64 fails the same way on every attempt, so it is
/// reported as `MalformedPayload` rather than `StorageUnavailable`.
pub(crate) fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> BalanceError {
    move |source| {
        if is_integer_overflow(&source) {
            warn!(operation, error = %source, "stored amounts overflow i64");
            return BalanceError::malformed(format!("integer overflow while {operation}"));
        }

        error!(operation, error = %source, "database error");
        BalanceError::StorageUnavailable { operation, source }
    }
}

fn is_integer_overflow(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(message)) if message == "integer overflow")
}
