pub mod postgres;
pub mod migrations;
pub mod repositories;

pub use postgres::{PostgresPool, create_postgres_pool};
pub use repositories::*;

use anyhow::Result;
use std::time::Duration;
use torvan_utils::DatabaseConfig;

/// Connect to PostgreSQL and bootstrap the schema. Returns `None` when no
/// URL is configured, in which case callers fall back to in-memory stores.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<Option<PostgresPool>> {
    let Some(url) = config.postgres_url.as_deref() else {
        tracing::info!("No PostgreSQL URL configured, using in-memory stores");
        return Ok(None);
    };

    let pool = create_postgres_pool(
        url,
        config.max_connections,
        Duration::from_secs(config.connection_timeout_seconds),
    )
    .await?;

    migrations::run_postgres_migrations(&pool).await?;

    Ok(Some(pool))
}
