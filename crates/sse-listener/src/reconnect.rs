use std::time::Duration;

use rand::RngExt;

/// Reconnect/backoff bounds shared by the session driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BackoffConfig {
    pub(crate) min_interval: Duration,
    pub(crate) max_interval: Duration,
    pub(crate) factor: f64,
    pub(crate) jitter: f64,
}

impl BackoffConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.min_interval.is_zero() {
            return Err("Min reconnect interval must be > 0".to_string());
        }
        if self.max_interval.is_zero() {
            return Err("Max reconnect interval must be > 0".to_string());
        }
        if self.max_interval < self.min_interval {
            return Err("Max reconnect interval must be >= min reconnect interval".to_string());
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err("Backoff factor must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) || !self.jitter.is_finite() {
            return Err("Jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_interval, self.max_interval)
    }

    /// Clamp a computed interval in seconds. Values past `Duration::MAX`
    /// saturate to the max.
    fn clamp_secs(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs)
            .map_or(self.max_interval, |interval| self.clamp(interval))
    }
}

/// Current reconnection interval of one session.
///
/// The interval always stays within `[min_interval, max_interval]`.
#[derive(Clone, Debug)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    interval: Duration,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        Self {
            interval: config.min_interval,
            config,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Back to the minimum, after a successful open.
    pub(crate) fn reset(&mut self) {
        self.interval = self.config.min_interval;
    }

    /// Grow the interval by the backoff factor, after a failed open.
    pub(crate) fn grow(&mut self) {
        let grown = self.interval.as_secs_f64() * self.config.factor;
        let capped = grown.min(self.config.max_interval.as_secs_f64());
        self.interval = self.config.clamp_secs(capped);
    }

    /// Adopt a server-advertised `retry:` interval.
    pub(crate) fn set_interval(&mut self, interval: Duration) {
        self.interval = self.config.clamp(interval);
    }

    /// The delay to sleep before the next attempt.
    ///
    /// Equal to the interval when jitter is zero; otherwise blended with a
    /// random fraction of it and clamped back into bounds.
    pub(crate) fn delay(&self) -> Duration {
        if self.config.jitter == 0.0 {
            return self.interval;
        }

        let base = self.interval.as_secs_f64();
        let mut rng = rand::rng();
        let randomized = rng.random_range(0.0..=base);
        let blended = base * (1.0 - self.config.jitter) + randomized * self.config.jitter;
        self.config.clamp_secs(blended)
    }
}
