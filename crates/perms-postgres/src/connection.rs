//! Pool construction with a fixed-delay retry.
//!
//! The database is often still starting when the service comes up, so
//! reaching it is retried a few times before the error is surfaced. Each
//! attempt opens a single plain connection. The pool is built only after the
//! server has answered one.

use perms_core::{BackendError, BackendResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{ConnectOptions, Connection, PgConnection, PgPool};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::PostgresConfig;

/// Open a pool, retrying up to `config.connect_attempts` times
pub async fn connect_with_retry(config: &PostgresConfig) -> BackendResult<PgPool> {
    let options = config.connect_options();

    retry(config.connect_attempts, config.connect_retry_delay(), || async {
        let conn: PgConnection = options.connect().await?;
        conn.close().await
    })
    .await
    .map_err(|e| BackendError::connection("postgres", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy_with(options);

    info!(host = %config.host, dbname = %config.dbname, "Connected to PostgreSQL database");
    Ok(pool)
}

/// Run `op` until it succeeds or `attempts` runs out, sleeping `delay`
/// between tries. There is no pause after the final failure.
pub async fn retry<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, error = %e, "Connection attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_retry_returns_first_success() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = retry(5, Duration::ZERO, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {} refused", n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry(5, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("refused".to_string())
        })
        .await;

        assert_eq!(result, Err("refused".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_retry_always_tries_once() {
        let calls = AtomicU32::new(0);

        let _: Result<(), String> = retry(0, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("refused".to_string())
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_waits_between_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let _: Result<(), String> = retry(3, Duration::from_millis(200), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("refused".to_string())
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_refused_server_fails_after_fixed_delays() {
        // Nothing listens on port 1; each attempt is refused at once
        let config = PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_attempts: 3,
            connect_retry_delay_secs: 1,
            ..PostgresConfig::default()
        };
        let started = Instant::now();

        let error = connect_with_retry(&config).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(2), "gave up early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "retried too long: {:?}", elapsed);
        assert!(matches!(error, BackendError::Connection { backend: "postgres", .. }));

        let source = error.source().and_then(|e| e.downcast_ref::<sqlx::Error>());
        assert!(matches!(source, Some(sqlx::Error::Io(_))), "{:?}", source);
    }
}
