//! Store error type and deadline helper shared by the Redis and Postgres paths.

use std::future::Future;
use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

/// Infrastructure failure talking to a backing store.
///
/// Carries the driver message for logging only. Domain errors collapse this
/// into a bare `StoreUnavailable` before it leaves an engine.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("too many concurrent modifications of {0}")]
    Contended(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Run a store call under a deadline. The future is dropped on expiry.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

/// Open a Postgres transaction whose statements the server cancels after
/// `deadline`. A lock wait then fails on the server too, so a transaction
/// abandoned by [`with_deadline`] releases its connection promptly.
pub async fn begin_with_deadline(
    pool: &PgPool,
    deadline: Duration,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    // 0 would disable the timeout altogether.
    let millis = deadline.as_millis().max(1);
    sqlx::query("SELECT set_config('statement_timeout', $1, true)")
        .bind(format!("{}ms", millis))
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_through_ok() {
        let value = with_deadline(Duration::from_secs(1), async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let result = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }
}
