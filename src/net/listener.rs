//! Control socket acquisition with retry.
//!
//! # Responsibilities
//! - Bind the Unix domain socket at the configured path
//! - Tolerate a previous server instance that has not released the path yet
//! - Give up after a fixed number of attempts with a distinguishable error
//!
//! # Design Decisions
//! - Fixed interval, no backoff: the previous holder releases within a
//!   bounded drain window, so waiting longer buys nothing
//! - Every failed attempt is followed by one interval, the last included, so
//!   exhaustion costs exactly `attempts × interval`
//! - The wait is an ordinary timer; dropping the future abandons the retry

use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UnixListener;

/// Attempt budget for binding the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenRetry {
    /// Total bind attempts, including the first.
    pub attempts: u32,
    /// Pause after each failed attempt.
    pub interval: Duration,
}

impl ListenRetry {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }
}

impl Default for ListenRetry {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Every bind attempt failed; `source` is the last failure.
    #[error("bind failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

/// A successfully bound resource and the attempt that produced it.
#[derive(Debug)]
pub struct Acquired<T> {
    pub value: T,
    /// 1-based attempt number; `attempt - 1` retry delays were incurred.
    pub attempt: u32,
}

/// Run `bind` until it succeeds or the retry budget is spent.
pub async fn acquire_with_retry<T, F>(retry: ListenRetry, mut bind: F) -> Result<Acquired<T>, ListenerError>
where
    F: FnMut() -> io::Result<T>,
{
    let attempts = retry.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match bind() {
            Ok(value) => return Ok(Acquired { value, attempt }),
            Err(source) => {
                tracing::debug!(
                    attempt,
                    max_attempts = attempts,
                    error = %source,
                    "control: bind failed"
                );
                tokio::time::sleep(retry.interval).await;
                if attempt >= attempts {
                    return Err(ListenerError::Exhausted { attempts, source });
                }
            }
        }
    }
}

/// Bind a Unix domain socket at `path`, retrying while it is held.
pub async fn bind_unix(path: &Path, retry: ListenRetry) -> Result<Acquired<UnixListener>, ListenerError> {
    acquire_with_retry(retry, || UnixListener::bind(path)).await
}
