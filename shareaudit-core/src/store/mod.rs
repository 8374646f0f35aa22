//! Result Store: connection-pooled, batched persistence for scan findings.
//! Grounded on `ferrex_core::database::infrastructure::postgres`'s
//! repository pattern, collapsed to one `Store` type since this schema has
//! no need for the trait-per-aggregate split the media catalog uses.

mod batch;
mod patterns_repo;
mod pool;
mod retry;
mod schema;
mod sessions;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Result, ScanError, StoreError};
use crate::models::{Pattern, SessionStatus, SessionTotals, ShareRecord};
use crate::orchestrator::ResultSink;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    statement_deadline: Duration,
}

impl Store {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool::connect(config).await?;
        Ok(Self {
            pool,
            statement_deadline: config.statement_timeout(),
        })
    }

    /// Creates the schema if absent and seeds default patterns if the
    /// patterns table is empty. Safe to call on an already-initialized
    /// store; re-running is a no-op.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        patterns_repo::seed_defaults_if_empty(&self.pool, self.statement_deadline).await?;
        Ok(())
    }

    pub async fn list_patterns(&self) -> Result<Vec<Pattern>> {
        Ok(patterns_repo::list(&self.pool, self.statement_deadline).await?)
    }

    pub async fn add_pattern(&self, pattern: &Pattern) -> Result<()> {
        Ok(patterns_repo::add(&self.pool, pattern, self.statement_deadline).await?)
    }

    pub async fn update_pattern(&self, pattern: &Pattern) -> Result<()> {
        Ok(patterns_repo::update(&self.pool, pattern, self.statement_deadline).await?)
    }

    pub async fn delete_pattern(&self, id: Uuid) -> Result<()> {
        Ok(patterns_repo::delete(&self.pool, id, self.statement_deadline).await?)
    }
}

#[async_trait]
impl ResultSink for Store {
    async fn begin_session(&self, domain: &str) -> Result<Uuid> {
        sessions::begin_session(&self.pool, domain, self.statement_deadline)
            .await
            .map_err(ScanError::from)
    }

    async fn store_batch(&self, records: Vec<ShareRecord>, session_id: Uuid) -> Result<(u64, u64)> {
        batch::store_batch(&self.pool, records, session_id, self.statement_deadline)
            .await
            .map_err(ScanError::from)
    }

    async fn end_session(
        &self,
        session_id: Uuid,
        totals: SessionTotals,
        status: SessionStatus,
    ) -> Result<()> {
        sessions::end_session(&self.pool, session_id, totals, status, self.statement_deadline)
            .await
            .map_err(ScanError::from)
    }
}
