//! Booking orchestrator server entry point.

use api::config::{BOOKING_PORT, Config};
use api::telemetry;
use saga::{HttpResourceOwnerClient, InMemoryBookingStore, PostgresBookingStore};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env(BOOKING_PORT);
    telemetry::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = telemetry::install_metrics()?;

    // 3. Build the resource owner client
    let policy = config.call_policy();
    tracing::info!(
        resource_owner_url = %config.resource_owner_url,
        timeout_ms = policy.timeout.as_millis() as u64,
        max_retries = policy.max_retries,
        "configuring resource owner client"
    );
    let pending_wait = policy.saga_budget();
    let client = HttpResourceOwnerClient::new(config.resource_owner_url.clone(), policy)?;

    // 4. Pick the booking store and build the application
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresBookingStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL booking store");
            api::create_booking_app(
                api::booking_state(store, client, pending_wait),
                metrics_handle,
            )
        }
        None => {
            tracing::info!("using in-memory booking store");
            api::create_booking_app(
                api::booking_state(InMemoryBookingStore::new(), client, pending_wait),
                metrics_handle,
            )
        }
    };

    // 5. Start server
    tracing::info!(addr = %config.addr(), "starting booking orchestrator");
    telemetry::serve(app, &config.addr()).await?;
    Ok(())
}
