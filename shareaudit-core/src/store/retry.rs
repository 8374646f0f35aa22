//! Retry wrapper shared by every Result Store operation: 3 attempts, 2s
//! linear backoff, a statement deadline wrapped around each attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;

pub const DEFAULT_ATTEMPTS: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Runs `op` up to `attempts` times, bounding each attempt by `deadline` and
/// backing off linearly (2s * attempt number) between transient failures.
/// Non-transient failures (e.g. constraint violations) are not retried.
pub async fn with_retry<T, F, Fut>(
    attempts: u32,
    deadline: Duration,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut last_error = None;
    for attempt in 1..=attempts.max(1) {
        let result = tokio::time::timeout(deadline, op()).await;
        match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) if err.is_transient() && attempt < attempts => {
                warn!(attempt, error = %err, "transient store error, retrying");
                last_error = Some(err);
                tokio::time::sleep(BACKOFF_STEP * attempt).await;
            }
            Ok(Err(err)) => return Err(to_permanent(err, attempt)),
            Err(_) => {
                let err = StoreError::Deadline(deadline);
                if attempt < attempts {
                    warn!(attempt, "store statement deadline exceeded, retrying");
                    last_error = Some(err);
                    tokio::time::sleep(BACKOFF_STEP * attempt).await;
                } else {
                    return Err(to_permanent(err, attempt));
                }
            }
        }
    }
    Err(to_permanent(
        last_error.unwrap_or(StoreError::Permanent {
            attempts,
            cause: "exhausted retries with no recorded cause".into(),
        }),
        attempts,
    ))
}

fn to_permanent(cause: StoreError, attempts: u32) -> StoreError {
    match cause {
        StoreError::Permanent { .. } => cause,
        other => StoreError::Permanent {
            attempts,
            cause: other.to_string(),
        },
    }
}
