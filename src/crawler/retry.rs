//! Exponential backoff with jitter for network operations
//!
//! A [`RetryPolicy`] is a plain value: each call site builds (or borrows) its
//! own policy and wraps the operation it wants retried. There is no state
//! shared between calls, so one endpoint failing never affects another.

use crate::ScrapeError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry configuration applied around a fallible async operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (always at least 1)
    pub max_retries: u32,

    /// Backoff base; attempt `n` waits `base_delay * 2^n` plus jitter
    pub base_delay: Duration,

    /// Upper bound of the uniform random jitter added to every wait
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the standard one-second jitter window
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
            jitter: Duration::from_secs(1),
        }
    }

    /// Policy used for term, department, and course listing fetches
    pub fn discovery() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    /// Policy used for per-course section fetches
    pub fn sections() -> Self {
        Self::new(2, Duration::from_millis(500))
    }

    /// Replaces the jitter window
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait before the attempt following failed attempt `attempt` (zero-based),
    /// without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.jitter.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
        };
        self.backoff(attempt) + jitter
    }

    /// Runs `op` until it succeeds or `max_retries` attempts have failed
    ///
    /// `operation` names the call site in logs and in the final error.
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful result
    /// * `Err(ScrapeError::Exhausted)` - Every attempt failed; wraps the last error
    ///
    /// # Example
    ///
    /// ```no_run
    /// use testudo_scrape::crawler::RetryPolicy;
    ///
    /// # async fn example(client: reqwest::Client) -> testudo_scrape::Result<()> {
    /// let body = RetryPolicy::discovery()
    ///     .run("fetch landing page", || async {
    ///         let response = client.get("https://app.testudo.umd.edu/soc/").send().await?;
    ///         Ok(response.text().await?)
    ///     })
    ///     .await?;
    /// # let _ = body;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 >= attempts => {
                    tracing::error!(
                        "Failed after {} attempts in {}: {}",
                        attempts,
                        operation,
                        e
                    );
                    return Err(ScrapeError::Exhausted {
                        operation: operation.to_string(),
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {} failed in {}: {}. Retrying in {:.2}s...",
                        attempt + 1,
                        operation,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::discovery()
    }
}
