use std::time::Duration;

use tracing::warn;

use crate::TickConfig;

/// Runtime metrics for a fixed-rate loop.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Ticks recorded.
    pub total_ticks: u64,
    /// Ticks whose execution reached the warning threshold.
    pub total_overruns: u64,
    /// Exponential moving average of tick execution time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Slowest tick observed.
    pub max_tick_time: Duration,
    /// Utilization of the last tick (>1.0 means over budget).
    pub budget_utilization: f64,
}

/// Watches how much of the tick budget each tick's work consumes.
///
/// Shared by every match tick in the process; a slow tick for one match eats
/// into the budget of the others, so the warning is process-wide.
#[derive(Debug, Clone)]
pub struct TickBudget {
    budget: Duration,
    warn_threshold: f64,
    critical_threshold: f64,
    metrics: TickMetrics,
}

impl TickBudget {
    pub fn new(config: &TickConfig) -> Self {
        let config = config.clone().validated();
        Self {
            budget: config.tick_duration(),
            warn_threshold: config.budget_warn_threshold,
            critical_threshold: config.budget_critical_threshold,
            metrics: TickMetrics::default(),
        }
    }

    /// Records how long one tick's work took.
    pub fn record(&mut self, elapsed: Duration) {
        let utilization = elapsed.as_secs_f64() / self.budget.as_secs_f64();
        self.metrics.total_ticks += 1;
        self.metrics.budget_utilization = utilization;

        if utilization >= self.critical_threshold {
            self.metrics.total_overruns += 1;
            warn!(
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.warn_threshold {
            self.metrics.total_overruns += 1;
            warn!(
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if elapsed > self.metrics.max_tick_time {
            self.metrics.max_tick_time = elapsed;
        }
        let alpha = 0.1;
        let prev = self.metrics.avg_tick_time.as_secs_f64();
        self.metrics.avg_tick_time = Duration::from_secs_f64(
            prev * (1.0 - alpha) + elapsed.as_secs_f64() * alpha,
        );
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_counts_overruns_above_warn_threshold() {
        let mut budget = TickBudget::new(&TickConfig::with_rate(20));
        budget.record(Duration::from_millis(10));
        budget.record(Duration::from_millis(45));
        budget.record(Duration::from_millis(80));
        let m = budget.metrics();
        assert_eq!(m.total_ticks, 3);
        assert_eq!(m.total_overruns, 2);
        assert_eq!(m.max_tick_time, Duration::from_millis(80));
        assert!(m.budget_utilization > 1.0);
    }

    #[test]
    fn test_budget_matches_tick_duration() {
        let budget = TickBudget::new(&TickConfig::with_rate(50));
        assert_eq!(budget.budget(), Duration::from_millis(20));
    }
}
