//! Per-tick context handed to every system's update.

use std::time::Duration;

/// Metadata for one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Monotonic tick counter, starting at 1 for the first tick.
    pub tick_id: u64,
    /// Time elapsed since the previous tick.
    pub dt: Duration,
    /// Total simulation time including this tick.
    pub elapsed: Duration,
}

impl Tick {
    /// Delta time in seconds, for integration math.
    #[must_use]
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dt_secs() {
        let tick = Tick {
            tick_id: 1,
            dt: Duration::from_millis(16),
            elapsed: Duration::from_millis(16),
        };
        assert!((tick.dt_secs() - 0.016).abs() < f32::EPSILON);
    }
}
