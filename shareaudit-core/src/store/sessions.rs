use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{SessionStatus, SessionTotals};

use super::retry::{with_retry, DEFAULT_ATTEMPTS};

pub async fn begin_session(
    pool: &PgPool,
    domain: &str,
    statement_deadline: std::time::Duration,
) -> Result<Uuid, StoreError> {
    let id = Uuid::new_v4();
    with_retry(DEFAULT_ATTEMPTS, statement_deadline, || async {
        sqlx::query(
            "INSERT INTO scan_sessions (id, domain, start_time, status) \
             VALUES ($1, $2, now(), 'running')",
        )
        .bind(id)
        .bind(domain)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(StoreError::Database)
    })
    .await?;
    Ok(id)
}

pub async fn end_session(
    pool: &PgPool,
    session_id: Uuid,
    totals: SessionTotals,
    status: SessionStatus,
    statement_deadline: std::time::Duration,
) -> Result<(), StoreError> {
    with_retry(DEFAULT_ATTEMPTS, statement_deadline, || async {
        sqlx::query(
            "UPDATE scan_sessions SET end_time = now(), total_hosts = $2, \
             total_shares = $3, total_sensitive = $4, status = $5 WHERE id = $1",
        )
        .bind(session_id)
        .bind(totals.total_hosts as i64)
        .bind(totals.total_shares as i64)
        .bind(totals.total_sensitive as i64)
        .bind(status.as_str())
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(StoreError::Database)
    })
    .await
}
