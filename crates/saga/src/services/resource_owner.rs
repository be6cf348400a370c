use async_trait::async_trait;
use common::{CorrelationId, DateRange, IdempotencyKey, ResourceId};
use lock_store::ReservationLock;

use crate::error::RemoteCallError;

/// The three resource owner operations a booking saga drives.
///
/// Every call carries the booking's idempotency key and correlation id. The
/// resource owner treats repeats of the same key as no-ops, so callers may
/// retry freely.
#[async_trait]
pub trait ResourceOwnerClient: Send + Sync {
    /// Places a hold on `resource_id` for `period`.
    async fn hold(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        period: DateRange,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError>;

    /// Confirms the hold placed under `key`.
    async fn confirm(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError>;

    /// Releases the hold placed under `key`.
    async fn release(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError>;
}
