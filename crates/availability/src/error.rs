//! Lock manager error types.

use common::{DateRange, IdempotencyKey, LockId, ResourceId};
use lock_store::LockStoreError;
use thiserror::Error;

/// Coarse classification of a [`LockError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockErrorKind {
    /// No lock exists for the idempotency key.
    NotFound,
    /// A state-transition or date-overlap rule was violated.
    Conflict,
    /// The store failed.
    Internal,
}

/// Errors returned by the reservation lock manager.
///
/// `NotFound` and the conflict variants are business outcomes and are never
/// retried by the manager.
#[derive(Debug, Error)]
pub enum LockError {
    /// No lock exists for the idempotency key.
    #[error("No reservation lock for request {0}")]
    NotFound(IdempotencyKey),

    /// The requested dates overlap a held or confirmed lock.
    #[error("Resource {resource_id} is unavailable for {period}")]
    Unavailable {
        resource_id: ResourceId,
        period: DateRange,
        conflicting: Vec<LockId>,
    },

    /// A released hold cannot be confirmed.
    #[error("Reservation lock for request {0} was already released")]
    AlreadyReleased(IdempotencyKey),

    /// Lock store error.
    #[error("Lock store error: {0}")]
    Store(#[from] LockStoreError),
}

impl LockError {
    pub fn kind(&self) -> LockErrorKind {
        match self {
            LockError::NotFound(_) => LockErrorKind::NotFound,
            LockError::Unavailable { .. } | LockError::AlreadyReleased(_) => {
                LockErrorKind::Conflict
            }
            LockError::Store(_) => LockErrorKind::Internal,
        }
    }
}

/// Convenience type alias for lock manager results.
pub type Result<T> = std::result::Result<T, LockError>;
