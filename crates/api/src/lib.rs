//! HTTP servers for the room booking system.
//!
//! Two routers share one crate: the resource owner exposes the reservation
//! lock contract (hold, confirm, release), and the booking orchestrator
//! runs booking sagas against it. Both carry structured logging (tracing),
//! correlation id propagation and Prometheus metrics.

pub mod config;
pub mod correlation;
pub mod error;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use availability::ReservationLockManager;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use lock_store::LockStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{BookingSaga, BookingStore, ResourceOwnerClient};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::bookings::BookingState;
use routes::resources::ResourceOwnerState;

/// Creates the resource owner router.
pub fn create_resource_owner_app<S: LockStore + 'static>(
    state: Arc<ResourceOwnerState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let app = Router::new()
        .route("/resources/{id}/hold", post(routes::resources::hold::<S>))
        .route("/resources/{id}/confirm", post(routes::resources::confirm::<S>))
        .route("/resources/{id}/release", post(routes::resources::release::<S>))
        .route("/resources/{id}/locks", get(routes::resources::locks::<S>))
        .route("/stats/resources/popular", get(routes::stats::popular::<S>))
        .with_state(state);

    with_common_layers(app, metrics_handle)
}

/// Creates the booking orchestrator router.
pub fn create_booking_app<B, R>(
    state: Arc<BookingState<B, R>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    B: BookingStore + 'static,
    R: ResourceOwnerClient + 'static,
{
    let app = Router::new()
        .route(
            "/bookings",
            post(routes::bookings::create::<B, R>).get(routes::bookings::list::<B, R>),
        )
        .route("/bookings/{request_id}", get(routes::bookings::get::<B, R>))
        .with_state(state);

    with_common_layers(app, metrics_handle)
}

fn with_common_layers(app: Router, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    app.route("/health", get(routes::health::check))
        .merge(metrics_router)
        .layer(middleware::from_fn(correlation::propagate))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wraps a lock store in resource owner state.
pub fn resource_owner_state<S: LockStore>(store: S) -> Arc<ResourceOwnerState<S>> {
    Arc::new(ResourceOwnerState {
        manager: ReservationLockManager::new(store),
    })
}

/// Wraps a booking store and resource owner client in orchestrator state.
///
/// `pending_wait` bounds how long a duplicate request waits on an
/// in-flight saga before resuming it.
pub fn booking_state<B, R>(
    store: B,
    resource_owner: R,
    pending_wait: Duration,
) -> Arc<BookingState<B, R>>
where
    B: BookingStore,
    R: ResourceOwnerClient,
{
    let saga = BookingSaga::new(store, resource_owner).with_pending_wait(pending_wait);
    Arc::new(BookingState {
        saga: Arc::new(saga),
    })
}
