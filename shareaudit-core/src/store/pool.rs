use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

/// Builds the connection pool per `DatabaseConfig`'s min/max settings.
/// Acquisition timeout mirrors the statement deadline so a starved pool
/// surfaces as a transient `StoreError` the retry wrapper can act on.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.statement_timeout())
        .connect(&config.connection_url())
        .await
        .map_err(StoreError::Database)
}
