use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Pattern;

use super::retry::{with_retry, DEFAULT_ATTEMPTS};

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: Uuid,
    regex: String,
    category: String,
    description: String,
    enabled: bool,
}

impl From<PatternRow> for Pattern {
    fn from(row: PatternRow) -> Self {
        Pattern {
            id: row.id,
            regex: row.regex,
            category: row.category,
            description: row.description,
            enabled: row.enabled,
        }
    }
}

pub async fn list(pool: &PgPool, deadline: std::time::Duration) -> Result<Vec<Pattern>, StoreError> {
    with_retry(DEFAULT_ATTEMPTS, deadline, || async {
        sqlx::query_as::<_, PatternRow>(
            "SELECT id, regex, category, description, enabled FROM sensitive_patterns ORDER BY category",
        )
        .fetch_all(pool)
        .await
        .map(|rows| rows.into_iter().map(Pattern::from).collect())
        .map_err(StoreError::Database)
    })
    .await
}

pub async fn add(pool: &PgPool, pattern: &Pattern, deadline: std::time::Duration) -> Result<(), StoreError> {
    with_retry(DEFAULT_ATTEMPTS, deadline, || async {
        sqlx::query(
            "INSERT INTO sensitive_patterns (id, regex, category, description, enabled) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(pattern.id)
        .bind(&pattern.regex)
        .bind(&pattern.category)
        .bind(&pattern.description)
        .bind(pattern.enabled)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(StoreError::Database)
    })
    .await
}

pub async fn update(pool: &PgPool, pattern: &Pattern, deadline: std::time::Duration) -> Result<(), StoreError> {
    with_retry(DEFAULT_ATTEMPTS, deadline, || async {
        sqlx::query(
            "UPDATE sensitive_patterns SET regex = $2, category = $3, description = $4, enabled = $5 \
             WHERE id = $1",
        )
        .bind(pattern.id)
        .bind(&pattern.regex)
        .bind(&pattern.category)
        .bind(&pattern.description)
        .bind(pattern.enabled)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(StoreError::Database)
    })
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, deadline: std::time::Duration) -> Result<(), StoreError> {
    with_retry(DEFAULT_ATTEMPTS, deadline, || async {
        sqlx::query("DELETE FROM sensitive_patterns WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(StoreError::Database)
    })
    .await
}

/// Seeds the table with the built-in default set if it is currently empty,
/// per `init()`'s contract in SPEC_FULL.md §4.2.
pub async fn seed_defaults_if_empty(pool: &PgPool, deadline: std::time::Duration) -> Result<(), StoreError> {
    let existing = list(pool, deadline).await?;
    if !existing.is_empty() {
        return Ok(());
    }
    for pattern in crate::patterns::default_patterns() {
        add(pool, &pattern, deadline).await?;
    }
    Ok(())
}
