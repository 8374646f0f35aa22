//! Transactional batch insert. Per-record failures are logged and skipped
//! rather than aborting the whole batch: each record is inserted under its
//! own `SAVEPOINT` nested inside the outer transaction, so a failure that
//! would otherwise poison the whole Postgres transaction only rolls back
//! that one record. String fields are truncated and counts clamped
//! defensively even though `ShareRecord`/`SensitiveFile` already enforce
//! these limits at construction time.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AccessLevel, EntryAttribute, EntryKind, ShareRecord};

use super::retry::{with_retry, DEFAULT_ATTEMPTS};

const MAX_NAME_LEN: usize = 255;
const MAX_PATH_LEN: usize = 4096;
const MAX_DETECTION_TYPE_LEN: usize = 50;

fn clamp_str(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}

fn clamp_nonneg(value: u64) -> i64 {
    value.min(i64::MAX as u64) as i64
}

/// Inserts up to `records.len()` share rows (and their root/sensitive file
/// children) in one transaction, returning `(shares_written, sensitive_written)`.
pub async fn store_batch(
    pool: &PgPool,
    records: Vec<ShareRecord>,
    session_id: Uuid,
    statement_deadline: std::time::Duration,
) -> Result<(u64, u64), StoreError> {
    with_retry(DEFAULT_ATTEMPTS, statement_deadline, || {
        let records = &records;
        async move {
            let mut tx = pool.begin().await.map_err(StoreError::Database)?;
            let mut shares_written = 0u64;
            let mut sensitive_written = 0u64;

            for record in records.iter() {
                let mut savepoint = tx.begin().await.map_err(StoreError::Database)?;
                match insert_one(&mut savepoint, record, session_id).await {
                    Ok(sensitive_count) => {
                        if let Err(err) = savepoint.commit().await {
                            warn!(
                                hostname = %record.hostname,
                                share = %record.share_name,
                                error = %err,
                                "skipping record whose savepoint failed to release"
                            );
                            continue;
                        }
                        shares_written += 1;
                        sensitive_written += sensitive_count;
                    }
                    Err(err) => {
                        if let Err(rollback_err) = savepoint.rollback().await {
                            warn!(error = %rollback_err, "failed to roll back savepoint for skipped record");
                        }
                        warn!(
                            hostname = %record.hostname,
                            share = %record.share_name,
                            error = %err,
                            "skipping record that failed to insert"
                        );
                    }
                }
            }

            tx.commit().await.map_err(StoreError::Database)?;
            Ok((shares_written, sensitive_written))
        }
    })
    .await
}

async fn insert_one(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &ShareRecord,
    session_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let share_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO shares \
         (id, session_id, hostname, share_name, access_level, error_message, \
          total_files, total_dirs, hidden_files, scan_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(share_id)
    .bind(session_id)
    .bind(clamp_str(&record.hostname, MAX_NAME_LEN))
    .bind(clamp_str(&record.share_name, MAX_NAME_LEN))
    .bind(access_level_str(record.access_level))
    .bind(record.error_message.as_deref())
    .bind(clamp_nonneg(record.total_files))
    .bind(clamp_nonneg(record.total_dirs))
    .bind(clamp_nonneg(record.hidden_files))
    .bind(record.scan_time)
    .execute(&mut **tx)
    .await?;

    for root_file in &record.root_files {
        sqlx::query(
            "INSERT INTO root_files \
             (share_id, name, kind, size_bytes, readonly, hidden, directory, created_at, modified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(share_id)
        .bind(clamp_str(&root_file.name, MAX_NAME_LEN))
        .bind(match root_file.kind {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        })
        .bind(clamp_nonneg(root_file.size_bytes))
        .bind(root_file.attributes.contains(&EntryAttribute::ReadOnly))
        .bind(root_file.attributes.contains(&EntryAttribute::Hidden))
        .bind(root_file.attributes.contains(&EntryAttribute::Directory))
        .bind(root_file.created_at)
        .bind(root_file.modified_at)
        .execute(&mut **tx)
        .await?;
    }

    let mut sensitive_count = 0u64;
    for sensitive in &record.sensitive_files {
        sqlx::query(
            "INSERT INTO sensitive_files (share_id, file_path, file_name, detection_type, description) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(share_id)
        .bind(clamp_str(&sensitive.path, MAX_PATH_LEN))
        .bind(clamp_str(&sensitive.name, MAX_NAME_LEN))
        .bind(clamp_str(&sensitive.detection_type, MAX_DETECTION_TYPE_LEN))
        .bind(&sensitive.description)
        .execute(&mut **tx)
        .await?;
        sensitive_count += 1;
    }

    Ok(sensitive_count)
}

fn access_level_str(level: AccessLevel) -> &'static str {
    level.as_str()
}
