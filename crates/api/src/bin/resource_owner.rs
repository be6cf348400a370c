//! Resource owner server entry point.

use api::config::{Config, RESOURCE_OWNER_PORT};
use api::telemetry;
use lock_store::{InMemoryLockStore, PostgresLockStore};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env(RESOURCE_OWNER_PORT);
    telemetry::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = telemetry::install_metrics()?;

    // 3. Pick the lock store and build the application
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresLockStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL lock store");
            api::create_resource_owner_app(api::resource_owner_state(store), metrics_handle)
        }
        None => {
            tracing::info!("using in-memory lock store");
            api::create_resource_owner_app(
                api::resource_owner_state(InMemoryLockStore::new()),
                metrics_handle,
            )
        }
    };

    // 4. Start server
    tracing::info!(addr = %config.addr(), "starting resource owner");
    telemetry::serve(app, &config.addr()).await?;
    Ok(())
}
