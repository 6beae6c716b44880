//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_secs` - Seconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay_secs: u64) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        log::warn!("Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay_secs}s...");
    }
}

/// Execute an operation, retrying errors the predicate accepts.
///
/// # Returns
/// The result of the operation, or the last error if all attempts failed.
pub fn with_retry_if<T, F, P>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    P: Fn(&Error) -> bool,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..config.max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !should_retry(&e) {
                    return Err(e);
                }

                // If this was the last attempt, return the error
                if attempt + 1 >= config.max_attempts {
                    last_error = Some(e);
                    break;
                }

                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, config.max_attempts, &e, delay.as_secs());
                }

                thread::sleep(delay);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other("retry exhausted".to_string())))
}

/// Execute an operation, retrying transient errors.
pub fn with_retry<T, F>(config: &RetryConfig, callback: Option<&dyn RetryCallback>, operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_if(config, callback, Error::is_retryable, operation)
}
