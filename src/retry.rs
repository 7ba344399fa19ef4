//! Bounded retry with capped multiplicative backoff.
//!
//! Every request the retriever makes goes through [`RetryPolicy::run`]: failures are
//! logged and retried, and once the attempt budget is spent the operation is
//! abandoned with a warning instead of an error.

use anyhow::Result;
use std::thread::sleep;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BACKOFF_BASE,
            max_delay: DEFAULT_BACKOFF_MAX,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 { multiplier } else { 1.0 };
        Self {
            max_retries: max_retries.max(1),
            base_delay: base_delay.min(max_delay),
            max_delay,
            multiplier,
        }
    }

    /// No sleeping between attempts. Handy for tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO, 1.0)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            attempt: 0,
            current: self.base_delay,
            max: self.max_delay,
            multiplier: self.multiplier,
        }
    }

    /// The sleeps a fully failing loop would perform, in order.
    pub fn delays(&self) -> Vec<Duration> {
        let mut b = self.backoff();
        (1..self.max_retries).map(|_| b.next_delay()).collect()
    }

    /// Run `op` up to `max_retries` times. Returns `None` when every attempt failed.
    /// `what` names the operation in log lines.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Option<T> {
        let mut backoff = self.backoff();
        let attempts = self.max_retries.max(1);
        for attempt in 1..=attempts {
            match op() {
                Ok(v) => return Some(v),
                Err(e) if attempt < attempts => {
                    let delay = backoff.next_delay();
                    tracing::debug!(
                        "{} failed (attempt {}/{}): {:#}; retrying in {:?}",
                        what, attempt, attempts, e, delay
                    );
                    sleep(delay);
                }
                Err(e) => {
                    tracing::warn!("{} abandoned after {} attempts: {:#}", what, attempts, e);
                }
            }
        }
        None
    }
}

/// Per-loop backoff state: attempt count and the delay to use next.
#[derive(Clone, Debug)]
pub struct Backoff {
    attempt: u32,
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn current_delay(&self) -> Duration {
        self.current
    }

    /// Return the delay for this failure and grow the next one, capped at the max.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempt += 1;
        let grown = (self.current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64());
        self.current = Duration::from_secs_f64(grown.max(0.0));
        delay
    }
}
