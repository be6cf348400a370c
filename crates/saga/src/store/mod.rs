//! Persistence for booking attempts on the orchestrator.

mod memory;
mod postgres;

use async_trait::async_trait;
use common::{IdempotencyKey, RequesterId};

pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;

use crate::attempt::{BookingAttempt, BookingStatus};
use crate::error::BookingStoreError;

pub type Result<T> = std::result::Result<T, BookingStoreError>;

/// Result of inserting a new pending attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The attempt was persisted; this caller owns the saga.
    Inserted(BookingAttempt),

    /// Another attempt with the same idempotency key already exists.
    Existing(BookingAttempt),
}

/// Storage for booking attempts, unique by idempotency key.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Looks up an attempt by its idempotency key.
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<BookingAttempt>>;

    /// Inserts `attempt` unless its key is already taken.
    async fn insert_if_absent(&self, attempt: BookingAttempt) -> Result<InsertOutcome>;

    /// Moves a `Pending` attempt to `status`.
    ///
    /// An attempt that already left `Pending` is returned unchanged.
    /// Returns `None` if no attempt exists for `key`.
    async fn finish(
        &self,
        key: &IdempotencyKey,
        status: BookingStatus,
    ) -> Result<Option<BookingAttempt>>;

    /// All attempts of one requester, newest first.
    async fn find_by_requester(&self, requester_id: RequesterId) -> Result<Vec<BookingAttempt>>;
}
