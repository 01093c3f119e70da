//! Bounded retry with linear backoff
//!
//! | Outcome of an attempt | Action |
//! |-----------------------|--------|
//! | Success | Return the value |
//! | `TransientNetwork` | Wait `base_delay * attempt`, try again |
//! | `TransientNetwork` on the last attempt | `ConnectivityExhausted` |
//! | Any other error | Return it unchanged, no retry |
//!
//! Cancellation is checked before every attempt and while backing off.

use super::events::{EventSink, ScanEvent};
use crate::config::FetchConfig;
use crate::HarvestError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; fewer than one attempt is treated as one
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.max_attempts, config.request_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after the zero-based `attempt` failed
    ///
    /// ```
    /// use forum_harvest::crawler::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(4, Duration::from_millis(500));
    /// assert_eq!(policy.backoff(0), Duration::ZERO);
    /// assert_eq!(policy.backoff(2), Duration::from_millis(1000));
    /// ```
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Runs `attempt_fn` until it succeeds, fails permanently, or the
    /// attempt budget runs out
    ///
    /// # Arguments
    ///
    /// * `url` - What is being fetched, for events and errors
    /// * `sink` - Receives one `Attempt` event per attempt
    /// * `cancel` - Aborts between attempts with `Cancelled`
    /// * `attempt_fn` - One fetch+parse unit
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<T, HarvestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }

            match attempt_fn().await {
                Ok(value) => {
                    sink.emit(ScanEvent::Attempt {
                        url: url.to_string(),
                        attempt,
                        status: "ok".to_string(),
                    });
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        self.max_attempts,
                        url,
                        e
                    );
                    sink.emit(ScanEvent::Attempt {
                        url: url.to_string(),
                        attempt,
                        status: e.to_string(),
                    });

                    if attempt + 1 < self.max_attempts {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(HarvestError::Cancelled),
                            _ = tokio::time::sleep(self.backoff(attempt)) => {}
                        }
                    }
                }
                Err(e) => {
                    sink.emit(ScanEvent::Attempt {
                        url: url.to_string(),
                        attempt,
                        status: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        Err(HarvestError::ConnectivityExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
