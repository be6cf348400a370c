//! In-process resource owner for tests and single-binary setups.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use availability::{LockError, LockErrorKind, ReservationLockManager};
use common::{CorrelationId, DateRange, IdempotencyKey, ResourceId};
use lock_store::{InMemoryLockStore, ReservationLock};
use tokio::sync::Mutex;

use super::resource_owner::ResourceOwnerClient;
use crate::error::RemoteCallError;
use crate::steps::{STEP_CONFIRM, STEP_HOLD, STEP_RELEASE};

/// One call received by an [`InMemoryResourceOwner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub step: &'static str,
    pub request_id: IdempotencyKey,
    pub correlation_id: CorrelationId,
}

/// Resource owner backed by a lock manager in the same process.
///
/// Failures can be injected per step to drive the compensation path.
#[derive(Clone)]
pub struct InMemoryResourceOwner {
    manager: Arc<ReservationLockManager<InMemoryLockStore>>,
    fail_on_hold: Arc<AtomicBool>,
    fail_on_confirm: Arc<AtomicBool>,
    lose_confirm_response: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for InMemoryResourceOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResourceOwner {
    pub fn new() -> Self {
        Self::with_manager(Arc::new(ReservationLockManager::new(InMemoryLockStore::new())))
    }

    pub fn with_manager(manager: Arc<ReservationLockManager<InMemoryLockStore>>) -> Self {
        Self {
            manager,
            fail_on_hold: Arc::new(AtomicBool::new(false)),
            fail_on_confirm: Arc::new(AtomicBool::new(false)),
            lose_confirm_response: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn manager(&self) -> &ReservationLockManager<InMemoryLockStore> {
        &self.manager
    }

    /// Rejects every hold with a 500.
    pub fn set_fail_on_hold(&self, fail: bool) {
        self.fail_on_hold.store(fail, Ordering::SeqCst);
    }

    /// Rejects every confirm with a 500.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.fail_on_confirm.store(fail, Ordering::SeqCst);
    }

    /// Applies confirms but reports a transport failure to the caller.
    pub fn set_lose_confirm_response(&self, lose: bool) {
        self.lose_confirm_response.store(lose, Ordering::SeqCst);
    }

    /// Returns every call received so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Returns the calls received for one step.
    pub async fn calls_for(&self, step: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.step == step)
            .cloned()
            .collect()
    }

    async fn record(&self, step: &'static str, key: &IdempotencyKey, correlation_id: &CorrelationId) {
        self.calls.lock().await.push(RecordedCall {
            step,
            request_id: key.clone(),
            correlation_id: correlation_id.clone(),
        });
    }
}

fn injected_failure(step: &str) -> RemoteCallError {
    RemoteCallError::Rejected {
        status: 500,
        body: format!("injected {step} failure"),
    }
}

fn rejection(step: &str, err: LockError) -> RemoteCallError {
    let status = match err.kind() {
        LockErrorKind::NotFound if step == STEP_RELEASE => 404,
        LockErrorKind::NotFound | LockErrorKind::Conflict => 409,
        LockErrorKind::Internal => 500,
    };
    RemoteCallError::Rejected {
        status,
        body: err.to_string(),
    }
}

#[async_trait]
impl ResourceOwnerClient for InMemoryResourceOwner {
    async fn hold(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        period: DateRange,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        self.record(STEP_HOLD, key, correlation_id).await;
        if self.fail_on_hold.load(Ordering::SeqCst) {
            return Err(injected_failure(STEP_HOLD));
        }
        self.manager
            .hold(key.clone(), resource_id, period)
            .await
            .map_err(|e| rejection(STEP_HOLD, e))
    }

    async fn confirm(
        &self,
        _resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        self.record(STEP_CONFIRM, key, correlation_id).await;
        if self.fail_on_confirm.load(Ordering::SeqCst) {
            return Err(injected_failure(STEP_CONFIRM));
        }
        let lock = self
            .manager
            .confirm(key)
            .await
            .map_err(|e| rejection(STEP_CONFIRM, e))?;
        if self.lose_confirm_response.load(Ordering::SeqCst) {
            return Err(RemoteCallError::Transport(
                "connection reset after confirm".to_string(),
            ));
        }
        Ok(lock)
    }

    async fn release(
        &self,
        _resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        self.record(STEP_RELEASE, key, correlation_id).await;
        self.manager
            .release(key)
            .await
            .map_err(|e| rejection(STEP_RELEASE, e))
    }
}
