//! Retransmission timeout policies.
//!
//! A stop-and-wait sender blocks for an acknowledgment no longer than the
//! current retransmission timeout.  This module provides:
//! - [`RetryPolicy`] — the interface the sender engine drives.
//! - [`AdaptiveTimer`] — additive decrease after clean deliveries,
//!   multiplicative increase after three consecutive failures, and a fatal
//!   ceiling.
//! - [`FixedTimeout`] — a constant timeout that never gives up.
//!
//! A policy value is cloned into every transfer session, so adaptation never
//! leaks from one `send` call into the next.

use std::time::Duration;

use thiserror::Error;

/// Consecutive failures that trigger a multiplicative back-off.
pub const FAILURES_BEFORE_BACKOFF: u32 = 3;

/// Adjustable timeout parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Timeout used for the first segment of a transfer.
    pub initial: Duration,
    /// Amount subtracted after each clean delivery.
    pub step: Duration,
    /// Floor for the additive decrease.
    pub min: Duration,
    /// A timeout strictly above this value aborts the transfer.
    pub ceiling: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            step: Duration::from_millis(100),
            min: Duration::from_millis(100),
            ceiling: Duration::from_secs(10),
        }
    }
}

impl TimerConfig {
    /// Reject configurations the timer cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min.is_zero() {
            return Err(ConfigError::ZeroMinimum);
        }
        if self.initial < self.min {
            return Err(ConfigError::InitialBelowMinimum {
                initial: self.initial,
                min: self.min,
            });
        }
        if self.initial > self.ceiling {
            return Err(ConfigError::InitialAboveCeiling {
                initial: self.initial,
                ceiling: self.ceiling,
            });
        }
        Ok(())
    }
}

/// Invalid sender, timer or simulator configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("minimum timeout must be non-zero")]
    ZeroMinimum,
    #[error("initial timeout {initial:?} is below the minimum {min:?}")]
    InitialBelowMinimum { initial: Duration, min: Duration },
    #[error("initial timeout {initial:?} is above the ceiling {ceiling:?}")]
    InitialAboveCeiling { initial: Duration, ceiling: Duration },
    #[error("mss must be between 1 and {max}, got {mss}")]
    InvalidMss { mss: usize, max: usize },
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

/// Decides how long to wait for an acknowledgment and when to give up.
pub trait RetryPolicy {
    /// Current bound on a single wait.
    fn timeout(&self) -> Duration;

    /// The in-flight segment was acknowledged cleanly and in order.
    fn on_clean_delivery(&mut self);

    /// An acknowledgment was corrupted or never arrived.
    fn on_failure(&mut self);

    /// `true` once the transfer must be abandoned.
    fn is_exhausted(&self) -> bool;
}

/// Additive-decrease / multiplicative-increase retransmission timer.
#[derive(Debug, Clone)]
pub struct AdaptiveTimer {
    config: TimerConfig,
    current: Duration,
    failures: u32,
}

impl Default for AdaptiveTimer {
    fn default() -> Self {
        Self::from_valid(TimerConfig::default())
    }
}

impl AdaptiveTimer {
    /// Build a timer, rejecting bounds under which it could reach zero or
    /// start above its own ceiling.
    pub fn new(config: TimerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: TimerConfig) -> Self {
        let current = config.initial;
        Self {
            config,
            current,
            failures: 0,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Failures recorded since the last back-off or clean delivery.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl RetryPolicy for AdaptiveTimer {
    fn timeout(&self) -> Duration {
        self.current
    }

    fn on_clean_delivery(&mut self) {
        self.failures = 0;
        self.current = self
            .current
            .saturating_sub(self.config.step)
            .max(self.config.min);
    }

    fn on_failure(&mut self) {
        self.failures += 1;
        if self.failures >= FAILURES_BEFORE_BACKOFF {
            self.failures = 0;
            self.current = self.current.saturating_mul(2);
            log::debug!("[arq] backing off, timeout now {:?}", self.current);
        }
    }

    fn is_exhausted(&self) -> bool {
        self.current > self.config.ceiling
    }
}

/// Constant timeout, retried forever.
///
/// Useful over channels that are known to recover, or to compare against the
/// adaptive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeout(pub Duration);

impl RetryPolicy for FixedTimeout {
    fn timeout(&self) -> Duration {
        self.0
    }

    fn on_clean_delivery(&mut self) {}

    fn on_failure(&mut self) {}

    fn is_exhausted(&self) -> bool {
        false
    }
}
