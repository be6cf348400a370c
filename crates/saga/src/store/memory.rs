use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{IdempotencyKey, RequesterId};
use tokio::sync::RwLock;

use super::{BookingStore, InsertOutcome, Result};
use crate::attempt::{BookingAttempt, BookingStatus};

/// In-memory booking store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    attempts: Arc<RwLock<HashMap<IdempotencyKey, BookingAttempt>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.read().await.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_by_key(&self, key: &IdempotencyKey) -> Result<Option<BookingAttempt>> {
        Ok(self.attempts.read().await.get(key).cloned())
    }

    async fn insert_if_absent(&self, attempt: BookingAttempt) -> Result<InsertOutcome> {
        let mut attempts = self.attempts.write().await;

        if let Some(existing) = attempts.get(&attempt.request_id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        attempts.insert(attempt.request_id.clone(), attempt.clone());
        Ok(InsertOutcome::Inserted(attempt))
    }

    async fn finish(
        &self,
        key: &IdempotencyKey,
        status: BookingStatus,
    ) -> Result<Option<BookingAttempt>> {
        let mut attempts = self.attempts.write().await;

        let Some(attempt) = attempts.get_mut(key) else {
            return Ok(None);
        };
        if attempt.status.can_finish() {
            attempt.status = status;
        }
        Ok(Some(attempt.clone()))
    }

    async fn find_by_requester(&self, requester_id: RequesterId) -> Result<Vec<BookingAttempt>> {
        let attempts = self.attempts.read().await;
        let mut found: Vec<_> = attempts
            .values()
            .filter(|a| a.requester_id == requester_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
