use std::time::{Duration, Instant};

use tracing::warn;

/// Configuration for a fixed-rate loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz (1..=128).
    pub tick_rate_hz: u32,
    /// Missed ticks run back to back, keeping the cadence, up to this many.
    /// Beyond it the rest are dropped and the next tick is due one period
    /// from now. Zero always skips ahead.
    pub max_catchup: u32,
    /// Fraction of the tick budget (0.0–1.0) above which a warning is logged.
    pub budget_warn_threshold: f64,
    /// Fraction of the tick budget above which the overrun is critical.
    pub budget_critical_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            max_catchup: 5,
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Create a config for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `tick_rate_hz` is kept within `1..=MAX_TICK_RATE_HZ`.
    /// - Thresholds are clamped to `0.0..=1.0`, warn never above critical.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz of 0 is not supported, using 1");
            self.tick_rate_hz = 1;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold =
            self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    /// Duration of a single tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    /// Computes when a repeating tick that was due at `scheduled` should fire
    /// next, given that it actually ran at `now`.
    ///
    /// Returns the next deadline and how many ticks were skipped.
    pub fn next_deadline(&self, scheduled: Instant, now: Instant) -> (Instant, u64) {
        let tick = self.tick_duration();
        let late_by = now.saturating_duration_since(scheduled);
        let behind = (late_by.as_nanos() / tick.as_nanos().max(1)) as u64;

        if behind <= self.max_catchup as u64 {
            return (scheduled + tick, 0);
        }
        let skipped = behind - self.max_catchup as u64;
        warn!(
            behind,
            skipped,
            late_ms = late_by.as_secs_f64() * 1000.0,
            "tick overrun, catch-up capped at {}",
            self.max_catchup
        );
        (now + tick, skipped)
    }
}
