//! Saga error types.

use std::time::Duration;

use common::IdempotencyKey;
use thiserror::Error;

/// Errors raised by booking store implementations.
#[derive(Debug, Error)]
pub enum BookingStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be mapped back to a booking attempt.
    #[error("Corrupt booking row: {0}")]
    CorruptRow(String),
}

/// Failure of one call to the resource owner.
#[derive(Debug, Clone, Error)]
pub enum RemoteCallError {
    /// The resource owner answered with a non-success status.
    #[error("Resource owner rejected the call with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request could not be delivered or the connection failed.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// No response within the per-call timeout.
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// A success response carried an unreadable body.
    #[error("Unreadable response: {0}")]
    InvalidResponse(String),
}

impl RemoteCallError {
    /// Transport failures and timeouts are retried; rejections are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteCallError::Transport(_) | RemoteCallError::Timeout(_))
    }
}

/// Errors that can occur during saga operations.
///
/// Remote failures never appear here: they end the saga as `Cancelled`.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Booking store error.
    #[error("Booking store error: {0}")]
    Store(#[from] BookingStoreError),

    /// The pending attempt disappeared before it could be finished.
    #[error("Booking attempt {0} vanished mid-saga")]
    AttemptMissing(IdempotencyKey),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
