//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retryable
//! - Execute retries with exponential backoff
//! - Bound the number of attempts at `max_retries + 1`
//!
//! # Design Decisions
//! - Transport failures always retryable; statuses only when whitelisted
//! - Validation, auth and parse failures propagate on the first attempt
//! - Attempts run strictly one after another on the calling task
//! - Retryable responses are dropped, never handed to the caller mid-loop

use std::future::Future;

use crate::config::schema::{RetryConfig, DEFAULT_RETRYABLE_STATUS_CODES};
use crate::error::{ClassifiedError, ErrorKind};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Anything carrying an HTTP status code the retry loop can inspect.
pub trait HasStatus {
    fn status_code(&self) -> u16;
}

impl HasStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Whether an error is worth retrying under the default status whitelist.
pub fn is_retryable_error(error: &ClassifiedError) -> bool {
    match error.kind() {
        ErrorKind::Network => true,
        _ => error
            .status()
            .is_some_and(|status| DEFAULT_RETRYABLE_STATUS_CODES.contains(&status)),
    }
}

/// Whether an error is worth retrying under a specific config.
fn is_retryable_under(config: &RetryConfig, error: &ClassifiedError) -> bool {
    match error.kind() {
        ErrorKind::Network => true,
        _ => error
            .status()
            .is_some_and(|status| config.is_retryable_status(status)),
    }
}

/// Run `operation` until it yields a final outcome.
///
/// The closure receives the 0-indexed attempt number. After a retryable
/// failure on attempt `i` the loop sleeps `retry_delay_ms * 2^i` before the
/// next attempt, up to `max_retries` retries.
pub async fn retry_with_backoff<F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<R, ClassifiedError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<R, ClassifiedError>>,
    R: HasStatus,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(response) => {
                let status = response.status_code();
                if attempt < config.max_retries && config.is_retryable_status(status) {
                    drop(response);
                    let delay = calculate_backoff(attempt, config.retry_delay_ms);
                    tracing::info!(attempt, status, delay = ?delay, "Retrying request");
                    metrics::record_fetch_retry("status");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Ok(response);
            }
            Err(error) => {
                if !is_retryable_under(config, &error) {
                    tracing::debug!(attempt, kind = %error.kind(), "Non-retryable failure");
                    return Err(error);
                }

                if attempt < config.max_retries {
                    let delay = calculate_backoff(attempt, config.retry_delay_ms);
                    tracing::info!(
                        attempt,
                        delay = ?delay,
                        error = %error,
                        "Retrying after network error"
                    );
                    metrics::record_fetch_retry("transport");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                tracing::warn!(attempts = attempt + 1, error = %error, "Retries exhausted");
                return Err(error);
            }
        }
    }
}
