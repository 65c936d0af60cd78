//! Backoff for SQLite lock contention.
//!
//! `agg` and a CLI command such as `add-feed` can hold the same database file
//! open at once, and concurrent scrape cycles share one pool. When the busy
//! timeout runs out SQLite still reports BUSY or LOCKED, so statements in the
//! scrape path go through [`with_retry`].

use std::future::Future;
use std::time::Duration;

/// Retries after the first attempt
const MAX_RETRIES: u32 = 4;
const BASE_DELAY: Duration = Duration::from_millis(100);

/// Primary result codes; extended codes (BUSY_SNAPSHOT = 517,
/// LOCKED_SHAREDCACHE = 262, ...) share the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Whether `err` is lock contention that may clear on its own
pub(crate) fn is_contention(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// 100ms, 200ms, 400ms, 800ms
fn backoff_delay(retry: u32) -> Duration {
    BASE_DELAY * 2u32.pow(retry)
}

/// Run `operation` until it succeeds, fails for a reason other than
/// contention, or runs out of retries. `what` names the statement in logs.
pub(crate) async fn with_retry<F, Fut, T>(what: &str, operation: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Err(e) if retry < MAX_RETRIES && is_contention(&e) => {
                let delay = backoff_delay(retry);
                tracing::debug!(
                    error = %e,
                    retry = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Database busy during {}, backing off",
                    what
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            result => return result,
        }
    }
}
