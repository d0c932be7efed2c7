use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::Backend;
use crate::consts::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS};
use crate::error::Result;
use crate::image::Image;
use crate::query::Query;

fn default_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

/// Bounded retry with linear backoff for transient backend failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Wait before retry `n` is `n * backoff_ms`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_ms: u64) -> Self {
        Self {
            attempts,
            backoff_ms,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The error of the last attempt is returned unchanged.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let wait = Duration::from_millis(self.backoff_ms * u64::from(attempt));
                    warn!(
                        label,
                        attempt,
                        attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "transient backend error, retrying"
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Evaluates queries on a backend under a [`RetryPolicy`].
pub struct Executor<'a> {
    backend: &'a dyn Backend,
    policy: RetryPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(backend: &'a dyn Backend, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn evaluate(&self, label: &str, query: &Query) -> Result<Vec<Image>> {
        self.policy.run(label, || self.backend.evaluate(query))
    }
}
