//! Booking endpoints of the orchestrator.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{DateRange, IdempotencyKey, RequesterId, ResourceId};
use saga::{BookingAttempt, BookingSaga, BookingStore, CreateBooking, ResourceOwnerClient};
use serde::Deserialize;

use crate::error::ApiError;

/// Header carrying the authenticated requester, set by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state of the booking orchestrator.
pub struct BookingState<B: BookingStore, R: ResourceOwnerClient> {
    pub saga: Arc<BookingSaga<B, R>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(alias = "roomId")]
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub period: DateRange,
    pub request_id: IdempotencyKey,
}

fn requester(headers: &HeaderMap) -> Result<RequesterId, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(RequesterId::new)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing or invalid {USER_ID_HEADER}")))
}

/// POST /bookings: run the booking saga and return its outcome.
///
/// The saga runs on its own task so a client disconnect cannot stop it
/// between steps.
#[tracing::instrument(skip_all)]
pub async fn create<B, R>(
    State(state): State<Arc<BookingState<B, R>>>,
    headers: HeaderMap,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<BookingAttempt>, ApiError>
where
    B: BookingStore + 'static,
    R: ResourceOwnerClient + 'static,
{
    let requester_id = requester(&headers)?;
    let Json(req) = payload?;

    let cmd = CreateBooking::new(requester_id, req.resource_id, req.period, req.request_id);
    let saga = state.saga.clone();
    let attempt = tokio::spawn(async move { saga.create_booking(cmd).await })
        .await
        .map_err(|e| ApiError::Internal(format!("booking task failed: {e}")))??;

    Ok(Json(attempt))
}

/// GET /bookings: the requester's bookings, newest first.
#[tracing::instrument(skip_all)]
pub async fn list<B, R>(
    State(state): State<Arc<BookingState<B, R>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingAttempt>>, ApiError>
where
    B: BookingStore + 'static,
    R: ResourceOwnerClient + 'static,
{
    let requester_id = requester(&headers)?;
    Ok(Json(state.saga.bookings_for(requester_id).await?))
}

/// GET /bookings/{requestId}: look up a booking by idempotency key.
///
/// Other requesters' bookings are reported as missing.
#[tracing::instrument(skip(state, headers))]
pub async fn get<B, R>(
    State(state): State<Arc<BookingState<B, R>>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Json<BookingAttempt>, ApiError>
where
    B: BookingStore + 'static,
    R: ResourceOwnerClient + 'static,
{
    let requester_id = requester(&headers)?;
    let key = IdempotencyKey::new(request_id)?;

    state
        .saga
        .get_booking(&key)
        .await?
        .filter(|attempt| attempt.requester_id == requester_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {key} not found")))
}
