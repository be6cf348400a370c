use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{IdempotencyKey, ResourceId};
use tokio::sync::RwLock;

use crate::{
    HoldOutcome, LockStatus, ReservationLock, ResourceUsage, Result, store::LockStore,
};

#[derive(Debug, Default)]
struct Tables {
    locks: HashMap<IdempotencyKey, ReservationLock>,
    usage: HashMap<ResourceId, u64>,
}

/// In-memory lock store.
///
/// One write lock guards both tables, so every mutating call is a single
/// atomic unit across all resources.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of locks stored, released ones included.
    pub async fn lock_count(&self) -> usize {
        self.tables.read().await.locks.len()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<ReservationLock>> {
        Ok(self.tables.read().await.locks.get(key).cloned())
    }

    async fn insert_if_available(&self, lock: ReservationLock) -> Result<HoldOutcome> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.locks.get(&lock.request_id) {
            return Ok(HoldOutcome::Existing(existing.clone()));
        }

        let mut conflicts: Vec<ReservationLock> = tables
            .locks
            .values()
            .filter(|other| other.resource_id == lock.resource_id && other.blocks(&lock.period))
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort_by_key(|l| l.created_at);
            return Ok(HoldOutcome::Conflict(conflicts));
        }

        tables.locks.insert(lock.request_id.clone(), lock.clone());
        Ok(HoldOutcome::Inserted(lock))
    }

    async fn transition(
        &self,
        key: &IdempotencyKey,
        from: LockStatus,
        to: LockStatus,
    ) -> Result<Option<ReservationLock>> {
        let mut tables = self.tables.write().await;

        let Some(lock) = tables.locks.get_mut(key) else {
            return Ok(None);
        };
        if lock.status != from {
            return Ok(None);
        }

        lock.status = to;
        lock.updated_at = Utc::now();
        let updated = lock.clone();

        if to == LockStatus::Confirmed {
            *tables.usage.entry(updated.resource_id).or_insert(0) += 1;
        }

        Ok(Some(updated))
    }

    async fn find_by_resource(&self, resource_id: ResourceId) -> Result<Vec<ReservationLock>> {
        let tables = self.tables.read().await;
        let mut locks: Vec<_> = tables
            .locks
            .values()
            .filter(|l| l.resource_id == resource_id)
            .cloned()
            .collect();
        locks.sort_by_key(|l| l.created_at);
        Ok(locks)
    }

    async fn usage(&self, resource_id: ResourceId) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .await
            .usage
            .get(&resource_id)
            .copied()
            .unwrap_or(0))
    }

    async fn most_booked(&self, limit: usize) -> Result<Vec<ResourceUsage>> {
        let tables = self.tables.read().await;
        let mut ranking: Vec<ResourceUsage> = tables
            .usage
            .iter()
            .map(|(resource_id, times_booked)| ResourceUsage {
                resource_id: *resource_id,
                times_booked: *times_booked,
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.times_booked
                .cmp(&a.times_booked)
                .then(a.resource_id.cmp(&b.resource_id))
        });
        ranking.truncate(limit);
        Ok(ranking)
    }
}
