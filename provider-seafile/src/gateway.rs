//! Rate-limited access to the remote API
//!
//! Every remote call made during a catalog run goes through
//! [`RateLimitedGateway::call`]. A throttled call is retried after the wait
//! the server advertises in its throttle message, bounded by
//! [`RateLimitConfig`]. Every other failure is returned untouched on the
//! first attempt.

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_runtime::config::RateLimitConfig;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SeafileError};

/// Matches the advisory wait in messages such as
/// `Request was throttled. Expected available in 12 seconds.`
static ADVISORY_WAIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:sec|second)s?\b").unwrap());

/// Parse the advisory wait out of a throttle message.
pub fn parse_advisory_wait(detail: &str) -> Option<Duration> {
    ADVISORY_WAIT
        .captures(detail)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Retries throttled remote operations after the server's advisory delay.
///
/// # Example
///
/// ```ignore
/// let gateway = RateLimitedGateway::new(RateLimitConfig::default());
/// let entries = gateway
///     .call("list_directory", || api.list_directory(&library, "/"))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitedGateway {
    config: RateLimitConfig,
    cancel: CancellationToken,
}

impl RateLimitedGateway {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token`: a cancelled token stops retries and interrupts waits.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait to apply for one throttle signal, padding included.
    fn backoff_for(&self, detail: &str) -> Duration {
        let advised = match parse_advisory_wait(detail) {
            Some(wait) => wait,
            None => {
                warn!(
                    detail = %detail,
                    fallback_secs = self.config.fallback_wait.as_secs(),
                    "Throttle message carries no wait time, using fallback"
                );
                self.config.fallback_wait
            }
        };

        advised.min(self.config.max_wait_per_retry) + self.config.retry_padding
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SeafileError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Run `operation`, retrying it while the remote reports throttling.
    ///
    /// # Errors
    ///
    /// - `RateLimitExhausted` once the retry count or total wait budget is spent
    /// - `Cancelled` if the cancellation token fires before or during a wait
    /// - any non-throttle error from `operation`, unchanged, without retry
    pub async fn call<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        let mut attempts: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SeafileError::Cancelled);
            }

            if !self.config.call_delay.is_zero() {
                self.pause(self.config.call_delay).await?;
            }

            let detail = match f().await {
                Ok(value) => return Ok(value),
                Err(BridgeError::RateLimited { detail }) => detail,
                Err(BridgeError::Cancelled) => return Err(SeafileError::Cancelled),
                Err(e) => return Err(e.into()),
            };

            let wait = self.backoff_for(&detail);

            if attempts >= self.config.max_retries || waited + wait > self.config.max_total_wait {
                warn!(
                    operation,
                    attempts,
                    waited_secs = waited.as_secs(),
                    "Giving up on throttled request"
                );
                return Err(SeafileError::RateLimitExhausted {
                    operation: operation.to_string(),
                    attempts,
                    waited,
                });
            }

            attempts += 1;
            waited += wait;

            debug!(
                operation,
                attempt = attempts,
                wait_secs = wait.as_secs(),
                "Throttled, waiting before retry"
            );

            self.pause(wait).await?;
        }
    }
}
