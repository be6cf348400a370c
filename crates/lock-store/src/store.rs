use async_trait::async_trait;
use common::{IdempotencyKey, ResourceId};

use crate::{LockStatus, ReservationLock, ResourceUsage, Result};

/// Result of an atomic hold insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The lock was persisted.
    Inserted(ReservationLock),

    /// A lock with the same idempotency key already exists; nothing was written.
    Existing(ReservationLock),

    /// Held or confirmed locks on the resource overlap the requested dates;
    /// nothing was written.
    Conflict(Vec<ReservationLock>),
}

/// Persistence for reservation locks and per-resource usage counters.
///
/// All implementations must be thread-safe (Send + Sync) and must make
/// `insert_if_available` and `transition` atomic: two racing holds on the
/// same resource for overlapping dates can never both be inserted, and a
/// status change is a compare-and-set.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Looks up a lock by its idempotency key.
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<ReservationLock>>;

    /// Inserts `lock` unless its key already exists or a blocking lock on the
    /// same resource overlaps its period. Check and insert form one unit.
    async fn insert_if_available(&self, lock: ReservationLock) -> Result<HoldOutcome>;

    /// Moves the lock from `from` to `to` if it is currently in `from`.
    ///
    /// Moving to `Confirmed` increments the resource's usage counter in the
    /// same unit. Returns `None` when the lock is missing or in another status.
    async fn transition(
        &self,
        key: &IdempotencyKey,
        from: LockStatus,
        to: LockStatus,
    ) -> Result<Option<ReservationLock>>;

    /// All locks ever taken on a resource, oldest first.
    async fn find_by_resource(&self, resource_id: ResourceId) -> Result<Vec<ReservationLock>>;

    /// Number of confirmed bookings for a resource.
    async fn usage(&self, resource_id: ResourceId) -> Result<u64>;

    /// Most booked resources first; ties ordered by resource id.
    async fn most_booked(&self, limit: usize) -> Result<Vec<ResourceUsage>>;
}
