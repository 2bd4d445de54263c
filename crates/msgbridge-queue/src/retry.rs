//! Bounded retry for side-effecting operations.

use crate::{QueueError, Result};
use std::fmt::Display;
use std::future::Future;
use tracing::{error, warn};

/// Default retry bound for network-bound worker operations.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Run `op`, retrying up to `max_retries` times after the initial attempt.
///
/// Every failure is logged. Exceeding the bound yields
/// [`QueueError::RetryLimitExceeded`], which the caller is expected to catch
/// at the boundary that initiated the retry and convert into a structured
/// error rather than let crash the worker.
pub async fn retry<T, E, F, Fut>(mut op: F, max_retries: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut failures = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                error!(%err, attempt = failures, "operation failed");
                if failures > max_retries {
                    return Err(QueueError::RetryLimitExceeded { attempts: failures });
                }
                warn!("retrying {failures}/{max_retries}");
            }
        }
    }
}
