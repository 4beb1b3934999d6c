//! Backoff policy: decides retry delays and when a head task is abandoned.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Backoff and expiry policy for the head task.
///
/// Pure: no clock, no I/O. The processing loop feeds it the consecutive
/// failure count and the task's age.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Consecutive failures after which the head task is dropped.
    pub max_retries: u32,

    /// Tasks older than this are dropped after their next attempt.
    pub max_age: Duration,
}

/// What the loop does with the head after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Take the head off the queue and reset the failure counter.
    Remove(RemovalReason),

    /// Keep the head; `failures` is the new consecutive failure count.
    Retry { failures: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Delivered,
    RetryBudgetExhausted,
    Expired,
}

impl RemovalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RemovalReason::Delivered => "delivered",
            RemovalReason::RetryBudgetExhausted => "retry_budget_exhausted",
            RemovalReason::Expired => "expired",
        }
    }
}

impl Default for BackoffPolicy {
    /// 500ms base, x1.5 per failure, 27 attempts, 48 hours.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 1.5,
            max_retries: 27,
            max_age: Duration::from_secs(48 * 60 * 60),
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt, given the consecutive failures so far.
    ///
    /// `None` when there has been no failure yet. Otherwise
    /// `base_delay * multiplier^(failures - 1)`:
    /// - failures 1: 500ms
    /// - failures 2: 750ms
    /// - failures 3: 1125ms
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures == 0 {
            return None;
        }
        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    /// A task whose clock reading lies in the future is never expired.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - created_at)
            .to_std()
            .is_ok_and(|age| age > self.max_age)
    }

    /// Decide the fate of the head task after one attempt.
    ///
    /// `failures` is the consecutive failure count *before* this attempt.
    pub fn evaluate(
        &self,
        delivered: bool,
        failures: u32,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Verdict {
        if delivered {
            return Verdict::Remove(RemovalReason::Delivered);
        }
        if self.is_expired(created_at, now) {
            return Verdict::Remove(RemovalReason::Expired);
        }
        let failures = failures.saturating_add(1);
        if failures >= self.max_retries {
            return Verdict::Remove(RemovalReason::RetryBudgetExhausted);
        }
        Verdict::Retry { failures }
    }
}
