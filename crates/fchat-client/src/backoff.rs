//! Delay between inbound reconnection attempts

use std::time::Duration;

use fchat_core::BackoffConfig;

/// Reconnect delay schedule driven by a [`BackoffConfig`].
///
/// With the default configuration (multiplier 1.0, no jitter) every
/// [`next_delay`](Self::next_delay) is the same fixed interval.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    /// Base delay for the next attempt, before jitter
    upcoming: Duration,
}

impl Backoff {
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            upcoming: config.initial,
        }
    }

    /// Delay to wait before the next attempt; grows the one after it
    pub fn next_delay(&mut self) -> Duration {
        let base = self.upcoming;
        self.upcoming = scale(base, self.config.multiplier)
            .unwrap_or(self.config.max)
            .min(self.config.max);

        if self.config.jitter > 0.0 {
            let extra = scale(base, self.config.jitter * rand::random::<f64>()).unwrap_or_default();
            base.saturating_add(extra)
        } else {
            base
        }
    }

    /// Start over from the initial delay, after a connection reached streaming
    pub fn reset(&mut self) {
        self.upcoming = self.config.initial;
    }
}

/// `duration * factor`, or `None` if the result is not a valid duration
fn scale(duration: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).ok()
}
