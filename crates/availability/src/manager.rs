//! Reservation lock manager.

use common::{DateRange, IdempotencyKey, ResourceId};
use lock_store::{HoldOutcome, LockStatus, LockStore, ReservationLock, ResourceUsage};

use crate::error::{LockError, Result};

/// Enforces the reservation lock state machine over a lock store.
///
/// ```text
/// hold ──► Held ──┬── confirm ──► Confirmed
///                 └── release ──► Released
/// ```
///
/// Replays are no-ops: holding an existing key, confirming a confirmed lock
/// and releasing a released lock all return the stored lock unchanged.
/// Releasing a confirmed lock is also a no-op, since a stale release must
/// never undo a confirmation.
pub struct ReservationLockManager<S: LockStore> {
    store: S,
}

impl<S: LockStore> ReservationLockManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying lock store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Claims `resource_id` for `period` under `key`.
    ///
    /// Fails with [`LockError::Unavailable`] if a held or confirmed lock on
    /// the resource overlaps `period`; nothing is created in that case.
    #[tracing::instrument(skip(self), fields(request_id = %key, resource_id = %resource_id))]
    pub async fn hold(
        &self,
        key: IdempotencyKey,
        resource_id: ResourceId,
        period: DateRange,
    ) -> Result<ReservationLock> {
        if let Some(existing) = self.store.find_by_key(&key).await? {
            return Ok(replayed_hold(existing, resource_id, period));
        }

        let outcome = self
            .store
            .insert_if_available(ReservationLock::held(key, resource_id, period))
            .await?;

        match outcome {
            HoldOutcome::Inserted(lock) => {
                metrics::counter!("lock_holds_total").increment(1);
                tracing::info!(lock_id = %lock.id, %period, "resource held");
                Ok(lock)
            }
            HoldOutcome::Existing(lock) => Ok(replayed_hold(lock, resource_id, period)),
            HoldOutcome::Conflict(conflicting) => {
                metrics::counter!("lock_conflicts_total").increment(1);
                tracing::info!(%period, conflicts = conflicting.len(), "hold rejected");
                Err(LockError::Unavailable {
                    resource_id,
                    period,
                    conflicting: conflicting.into_iter().map(|l| l.id).collect(),
                })
            }
        }
    }

    /// Confirms the hold for `key` and counts a booking for its resource.
    #[tracing::instrument(skip(self), fields(request_id = %key))]
    pub async fn confirm(&self, key: &IdempotencyKey) -> Result<ReservationLock> {
        loop {
            let lock = self.get(key).await?;
            match lock.status {
                LockStatus::Confirmed => return Ok(lock),
                LockStatus::Released => return Err(LockError::AlreadyReleased(key.clone())),
                LockStatus::Held => {
                    if let Some(confirmed) = self
                        .store
                        .transition(key, LockStatus::Held, LockStatus::Confirmed)
                        .await?
                    {
                        metrics::counter!("lock_confirms_total").increment(1);
                        tracing::info!(resource_id = %confirmed.resource_id, "hold confirmed");
                        return Ok(confirmed);
                    }
                    // Lost a race with a concurrent confirm or release; re-read.
                }
            }
        }
    }

    /// Releases the hold for `key`. Confirmed locks are returned unchanged.
    #[tracing::instrument(skip(self), fields(request_id = %key))]
    pub async fn release(&self, key: &IdempotencyKey) -> Result<ReservationLock> {
        loop {
            let lock = self.get(key).await?;
            match lock.status {
                LockStatus::Released => return Ok(lock),
                LockStatus::Confirmed => {
                    tracing::debug!("release ignored for confirmed lock");
                    return Ok(lock);
                }
                LockStatus::Held => {
                    if let Some(released) = self
                        .store
                        .transition(key, LockStatus::Held, LockStatus::Released)
                        .await?
                    {
                        metrics::counter!("lock_releases_total").increment(1);
                        tracing::info!(resource_id = %released.resource_id, "hold released");
                        return Ok(released);
                    }
                }
            }
        }
    }

    /// Loads a lock by key.
    pub async fn get(&self, key: &IdempotencyKey) -> Result<ReservationLock> {
        self.store
            .find_by_key(key)
            .await?
            .ok_or_else(|| LockError::NotFound(key.clone()))
    }

    /// All locks taken on a resource, oldest first.
    pub async fn locks_for_resource(&self, resource_id: ResourceId) -> Result<Vec<ReservationLock>> {
        Ok(self.store.find_by_resource(resource_id).await?)
    }

    /// Number of confirmed bookings for a resource.
    pub async fn usage(&self, resource_id: ResourceId) -> Result<u64> {
        Ok(self.store.usage(resource_id).await?)
    }

    /// Most booked resources first.
    pub async fn most_booked(&self, limit: usize) -> Result<Vec<ResourceUsage>> {
        Ok(self.store.most_booked(limit).await?)
    }
}

fn replayed_hold(lock: ReservationLock, resource_id: ResourceId, period: DateRange) -> ReservationLock {
    if lock.resource_id != resource_id || lock.period != period {
        tracing::warn!(
            stored_resource_id = %lock.resource_id,
            stored_period = %lock.period,
            %period,
            "hold replayed with different arguments; keeping stored lock"
        );
    } else {
        tracing::debug!(lock_id = %lock.id, "hold replayed");
    }
    lock
}
