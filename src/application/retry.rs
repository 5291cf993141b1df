//! Retry with exponential backoff for generation calls.
//!
//! Failures are classified into rate limits, timeouts and everything else.
//! Only the first two are retried; anything else is returned immediately.

use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::ports::GenerationError;

/// Total attempts per call, including the first.
pub const MAX_RETRIES: u32 = 3;

/// Delay before the first retry.
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimit,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::RateLimit | FailureKind::Timeout)
    }
}

/// Errors that can tell the retry policy what kind of failure they are.
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

impl Classify for GenerationError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            GenerationError::RateLimit(_) => FailureKind::RateLimit,
            GenerationError::Timeout(_) => FailureKind::Timeout,
            GenerationError::Other(_) => FailureKind::Other,
        }
    }
}

/// Source of backoff delays, swappable so tests don't wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    multiplier: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("multiplier", &self.multiplier)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Three attempts, 1s then 2s between them.
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            initial_delay: INITIAL_DELAY,
            multiplier: 2,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
            multiplier: config.multiplier.max(1),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `call` until it succeeds, fails with a non-transient error, or
    /// runs out of attempts. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let kind = err.failure_kind();
                    if !kind.is_transient() {
                        tracing::debug!(operation, attempt, error = %err, "Non-retryable failure");
                        return Err(err);
                    }
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            operation,
                            attempts = attempt,
                            kind = ?kind,
                            error = %err,
                            "Retries exhausted"
                        );
                        return Err(err);
                    }

                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        kind = ?kind,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    delay = delay
                        .checked_mul(self.multiplier)
                        .map_or(MAX_DELAY, |next| next.min(MAX_DELAY));
                    attempt += 1;
                }
            }
        }
    }
}
