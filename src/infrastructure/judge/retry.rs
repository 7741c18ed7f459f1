use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::{JudgeApiError, JudgeError};

/// Retry policy for judge calls
///
/// Makes one initial attempt and up to `max_retries` further attempts for
/// transient failures. The sleep before retry `k` (0-based) is
/// `min(initial_backoff_ms * 2^k, max_backoff_ms)`.
///
/// # Retry Decision
/// - Retry on: 429, 5xx (incl. 529), timeouts, dropped connections
/// - Do NOT retry: 400, 401, 403, 404, malformed responses
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// `max_backoff_ms` is raised to `initial_backoff_ms` if it is smaller.
    ///
    /// # Example
    /// ```
    /// use arbiter::infrastructure::judge::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 1_000, 30_000);
    /// assert_eq!(policy.max_retries(), 3);
    /// ```
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation with exponential backoff retry logic
    ///
    /// # Returns
    /// * `Ok(T)` - an attempt succeeded
    /// * `Err(JudgeError::Rejected)` - a permanent error, returned without retrying
    /// * `Err(JudgeError::RetriesExhausted)` - transient errors outlasted the budget
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, JudgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, JudgeApiError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Judge call succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) if err.is_permanent() => {
                    debug!("Permanent judge error, not retrying: {}", err);
                    return Err(JudgeError::Rejected { source: err });
                }
                Err(err) if attempt >= self.max_retries => {
                    warn!("Judge call failed after {} attempts: {}", attempt + 1, err);
                    return Err(JudgeError::RetriesExhausted {
                        attempts: attempt + 1,
                        source: err,
                    });
                }
                Err(err) => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Attempt {} failed with transient error: {}. Retrying in {:?}...",
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Formula: min(initial_backoff * 2^attempt, max_backoff)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    /// Three retries starting at one second, capped at 30 seconds
    fn default() -> Self {
        Self::new(3, 1_000, 30_000)
    }
}
