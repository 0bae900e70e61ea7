//! Listener session configuration.

use std::time::Duration;

use crate::reconnect::BackoffConfig;

/// Configuration for a listening session.
///
/// Follows the usual builder pattern: sensible defaults plus chainable
/// setters. Every session owns its own copy, so sessions with different
/// policies can run side by side.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    // Reconnection settings
    /// Smallest delay before reopening a stream.
    pub reconnect_min_interval: Duration,
    /// Largest delay before reopening a stream.
    pub reconnect_max_interval: Duration,
    /// Multiplier applied to the delay after every failed open.
    pub reconnect_backoff_factor: f64,
    /// Random jitter factor (0.0–1.0) for reconnection delays.
    pub reconnect_jitter: f64,
    /// Consecutive retriable open failures tolerated (None = infinite).
    pub max_retries: Option<u32>,

    // Parsing
    /// Malformed lines tolerated per stream instance before it is dropped
    /// and reopened.
    pub max_malformed_lines: usize,

    // Channels
    /// Capacity of the event channel.
    pub event_channel_capacity: usize,
    /// Capacity of the command channel.
    pub command_channel_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            reconnect_min_interval: Duration::from_secs(1),
            reconnect_max_interval: Duration::from_secs(60),
            reconnect_backoff_factor: 2.0,
            reconnect_jitter: 0.0,
            max_retries: Some(10),
            max_malformed_lines: 100,
            event_channel_capacity: 256,
            command_channel_capacity: 64,
        }
    }
}

impl ListenerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum reconnection interval.
    #[must_use]
    pub fn reconnect_min_interval(mut self, interval: Duration) -> Self {
        self.reconnect_min_interval = interval;
        self
    }

    /// Set the maximum reconnection interval.
    #[must_use]
    pub fn reconnect_max_interval(mut self, interval: Duration) -> Self {
        self.reconnect_max_interval = interval;
        self
    }

    /// Set the reconnection backoff factor.
    #[must_use]
    pub fn reconnect_backoff_factor(mut self, factor: f64) -> Self {
        self.reconnect_backoff_factor = factor;
        self
    }

    /// Set the reconnection jitter factor.
    #[must_use]
    pub fn reconnect_jitter(mut self, jitter: f64) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Set the retriable-failure budget.
    #[must_use]
    pub fn max_retries(mut self, retries: Option<u32>) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the malformed-line ceiling.
    #[must_use]
    pub fn max_malformed_lines(mut self, lines: usize) -> Self {
        self.max_malformed_lines = lines;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub fn command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    pub(crate) fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            min_interval: self.reconnect_min_interval,
            max_interval: self.reconnect_max_interval,
            factor: self.reconnect_backoff_factor,
            jitter: self.reconnect_jitter,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message string if any field has an invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.backoff().validate()?;
        if self.event_channel_capacity == 0 {
            return Err("Event channel capacity must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        Ok(())
    }
}
