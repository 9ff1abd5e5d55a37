use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct Options {
    /// Ratio between the promotion thresholds of consecutive levels.
    pub probability: f32,
    /// Number of levels a freshly created list starts with. At least 2.
    pub initial_depth: usize,
    /// Seed for the height draws. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            probability: 0.25,
            initial_depth: 2,
            seed: None,
        }
    }
}

impl Options {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.probability > 0.0 && self.probability < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "probability must be in (0, 1), got {}",
                self.probability
            )));
        }
        if self.initial_depth < 2 {
            return Err(Error::InvalidArgument(format!(
                "initial depth must be at least 2, got {}",
                self.initial_depth
            )));
        }
        Ok(())
    }
}

/// How `Store::run_transaction` reacts to conflicts.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// `None` retries until the transaction commits.
    pub max_attempts: Option<usize>,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: None,
            base_backoff: Duration::from_micros(10),
            max_backoff: Duration::from_millis(5),
        }
    }
}

impl RetryPolicy {
    /// Upper bound of the jittered sleep after the `attempt`-th conflict.
    pub fn backoff_limit(&self, attempt: usize) -> Duration {
        let shift = attempt.min(16) as u32;
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}
