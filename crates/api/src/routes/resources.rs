//! Reservation lock endpoints of the resource owner.

use std::sync::Arc;

use availability::ReservationLockManager;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Extension;
use common::{CorrelationId, DateRange, IdempotencyKey, ResourceId};
use lock_store::{LockStore, ReservationLock};
use serde::Deserialize;

use crate::error::ApiError;

/// Shared state of the resource owner.
pub struct ResourceOwnerState<S: LockStore> {
    pub manager: ReservationLockManager<S>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRequest {
    pub request_id: IdempotencyKey,
    #[serde(flatten)]
    pub period: DateRange,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockKeyRequest {
    pub request_id: IdempotencyKey,
}

// -- Handlers --

/// POST /resources/{id}/hold: claim the resource for a date range.
#[tracing::instrument(skip_all, fields(resource_id = id, correlation_id = %correlation_id))]
pub async fn hold<S: LockStore + 'static>(
    State(state): State<Arc<ResourceOwnerState<S>>>,
    Path(id): Path<i64>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<HoldRequest>, JsonRejection>,
) -> Result<Json<ReservationLock>, ApiError> {
    let Json(req) = payload?;
    let lock = state
        .manager
        .hold(req.request_id, ResourceId::new(id), req.period)
        .await
        .map_err(ApiError::from_lock)?;
    Ok(Json(lock))
}

/// POST /resources/{id}/confirm: confirm a hold.
#[tracing::instrument(skip_all, fields(resource_id = id, correlation_id = %correlation_id))]
pub async fn confirm<S: LockStore + 'static>(
    State(state): State<Arc<ResourceOwnerState<S>>>,
    Path(id): Path<i64>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<LockKeyRequest>, JsonRejection>,
) -> Result<Json<ReservationLock>, ApiError> {
    let Json(req) = payload?;
    let lock = state
        .manager
        .confirm(&req.request_id)
        .await
        .map_err(ApiError::from_lock)?;
    warn_on_resource_mismatch(id, &lock);
    Ok(Json(lock))
}

/// POST /resources/{id}/release: give a hold back.
#[tracing::instrument(skip_all, fields(resource_id = id, correlation_id = %correlation_id))]
pub async fn release<S: LockStore + 'static>(
    State(state): State<Arc<ResourceOwnerState<S>>>,
    Path(id): Path<i64>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<LockKeyRequest>, JsonRejection>,
) -> Result<Json<ReservationLock>, ApiError> {
    let Json(req) = payload?;
    let lock = state
        .manager
        .release(&req.request_id)
        .await
        .map_err(ApiError::from_release)?;
    warn_on_resource_mismatch(id, &lock);
    Ok(Json(lock))
}

/// GET /resources/{id}/locks: every lock taken on the resource, oldest first.
#[tracing::instrument(skip(state))]
pub async fn locks<S: LockStore + 'static>(
    State(state): State<Arc<ResourceOwnerState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReservationLock>>, ApiError> {
    let locks = state
        .manager
        .locks_for_resource(ResourceId::new(id))
        .await
        .map_err(ApiError::from_lock)?;
    Ok(Json(locks))
}

// Confirm and release act on the key alone.
fn warn_on_resource_mismatch(path_id: i64, lock: &ReservationLock) {
    if lock.resource_id.as_i64() != path_id {
        tracing::warn!(
            lock_resource_id = %lock.resource_id,
            "request path names a different resource than the lock"
        );
    }
}
