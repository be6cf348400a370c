//! Resource popularity statistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use lock_store::{LockStore, ResourceUsage};
use serde::Deserialize;

use super::resources::ResourceOwnerState;
use crate::error::ApiError;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// GET /stats/resources/popular: most booked resources first.
pub async fn popular<S: LockStore + 'static>(
    State(state): State<Arc<ResourceOwnerState<S>>>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<ResourceUsage>>, ApiError> {
    let ranking = state
        .manager
        .most_booked(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await
        .map_err(ApiError::from_lock)?;
    Ok(Json(ranking))
}
