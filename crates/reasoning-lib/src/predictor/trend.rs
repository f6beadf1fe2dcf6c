//! Trend-based failure prediction over metric history

use super::features::{linear_regression_slope, present_series};
use super::{SubPrediction, SubPredictor};
use crate::models::{MetricsSnapshot, PredictionMetrics, RootCauseType};
use anyhow::Result;

/// Minimum history length before any trend is considered
pub const MIN_TREND_POINTS: usize = 3;

/// Tunables for trend detection. Slopes are in percentage points per
/// history interval and horizons in intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub memory_slope: f64,
    pub memory_horizon: f64,
    pub memory_probability: f64,
    pub disk_slope: f64,
    pub disk_horizon: f64,
    pub disk_probability: f64,
    pub restart_delta: f64,
    pub restart_probability: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            memory_slope: 5.0,
            memory_horizon: 10.0,
            memory_probability: 0.7,
            disk_slope: 3.0,
            disk_horizon: 20.0,
            disk_probability: 0.6,
            restart_delta: 3.0,
            restart_probability: 0.75,
        }
    }
}

/// Growth of a usage series toward 100%
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exhaustion {
    pub slope: f64,
    /// Intervals until the series reaches 100%; zero or negative when it
    /// already has
    pub time_to_failure: f64,
}

/// Slope and time to 100% if the series rises faster than `min_slope`
pub fn project_exhaustion(values: &[f64], min_slope: f64) -> Option<Exhaustion> {
    if values.len() < MIN_TREND_POINTS {
        return None;
    }
    let slope = linear_regression_slope(values);
    if slope <= min_slope || slope <= 0.0 {
        return None;
    }
    let current = *values.last()?;
    Some(Exhaustion {
        slope,
        time_to_failure: (100.0 - current) / slope,
    })
}

#[derive(Default)]
pub struct TrendPredictor {
    config: TrendConfig,
}

impl TrendPredictor {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }
}

impl SubPredictor for TrendPredictor {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn evaluate(&self, metrics: &PredictionMetrics) -> Result<Option<SubPrediction>> {
        let history = &metrics.history;
        if history.len() < MIN_TREND_POINTS {
            return Ok(None);
        }
        let mut prediction = SubPrediction::default();

        let memory = present_series(history, MetricsSnapshot::memory_usage);
        if let Some(exhaustion) = project_exhaustion(&memory, self.config.memory_slope) {
            if exhaustion.time_to_failure < self.config.memory_horizon {
                prediction.record(
                    self.config.memory_probability,
                    RootCauseType::OomKiller,
                    format!(
                        "Memory increasing at {:.1}% per interval, {:.1} intervals to exhaustion",
                        exhaustion.slope, exhaustion.time_to_failure
                    ),
                );
            }
        }

        let disk = present_series(history, MetricsSnapshot::disk_usage);
        if let Some(exhaustion) = project_exhaustion(&disk, self.config.disk_slope) {
            if exhaustion.time_to_failure < self.config.disk_horizon {
                prediction.record(
                    self.config.disk_probability,
                    RootCauseType::DiskPressure,
                    format!("Disk usage increasing at {:.1}% per interval", exhaustion.slope),
                );
            }
        }

        let restarts: Vec<f64> = history
            .iter()
            .map(|s| s.restart_count.unwrap_or(0.0))
            .collect();
        if let (Some(first), Some(last)) = (restarts.first(), restarts.last()) {
            let delta = last - first;
            if delta >= self.config.restart_delta {
                prediction.record(
                    self.config.restart_probability,
                    RootCauseType::ConfigError,
                    format!("Restart frequency increasing ({} restarts in window)", delta),
                );
            }
        }

        Ok(prediction.into_fired())
    }
}
