//! Tick loop configuration.

use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Configuration for the frame loop driving a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Upper bound for a single frame's delta, in milliseconds. Keeps a
    /// stalled frame from feeding one huge step into every system.
    pub max_delta_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            max_delta_ms: 250,
        }
    }
}

impl TickConfig {
    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Fails if the tick rate is not a positive finite number or the delta
    /// clamp is zero.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick_rate must be positive, got {}",
            self.tick_rate
        );
        ensure!(self.max_delta_ms > 0, "max_delta_ms must be non-zero");
        Ok(())
    }

    /// Wall-clock budget of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }

    /// Largest delta handed to systems in one tick.
    #[must_use]
    pub fn max_delta(&self) -> Duration {
        Duration::from_millis(self.max_delta_ms)
    }

    /// Override the tick cap.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}
