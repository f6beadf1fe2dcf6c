//! Threshold-based failure prediction over current metrics

use super::{SubPrediction, SubPredictor};
use crate::analyzer::rules::MetricKind;
use crate::models::{PredictionMetrics, RootCauseType};
use anyhow::Result;

/// One level of a threshold rule
#[derive(Debug, Clone)]
pub struct ThresholdTier {
    pub metric: MetricKind,
    pub threshold: f64,
    pub probability: f64,
    pub factor: fn(f64) -> String,
}

/// Tiers are checked in order and only the first one reached fires
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    pub root_cause: RootCauseType,
    pub tiers: Vec<ThresholdTier>,
}

fn memory_at(v: f64) -> String {
    format!("Memory usage at {}%", v)
}

fn memory_approaching(v: f64) -> String {
    format!("Memory usage approaching limit ({}%)", v)
}

fn cpu_throttling_at(v: f64) -> String {
    format!("CPU throttling at {}%", v)
}

fn cpu_high(v: f64) -> String {
    format!("High CPU usage ({}%)", v)
}

fn disk_at(v: f64) -> String {
    format!("Disk usage at {}%", v)
}

fn disk_approaching(v: f64) -> String {
    format!("Disk usage approaching limit ({}%)", v)
}

fn network_error_rate(v: f64) -> String {
    format!("Network error rate at {:.1}%", v * 100.0)
}

fn restarts(v: f64) -> String {
    format!("Pod restarted {} times", v)
}

fn tier(metric: MetricKind, threshold: f64, probability: f64, factor: fn(f64) -> String) -> ThresholdTier {
    ThresholdTier {
        metric,
        threshold,
        probability,
        factor,
    }
}

/// Memory, CPU, disk, network and restart rules in evaluation order
pub fn default_threshold_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule {
            root_cause: RootCauseType::OomKiller,
            tiers: vec![
                tier(MetricKind::MemoryUsage, 95.0, 0.9, memory_at),
                tier(MetricKind::MemoryUsage, 85.0, 0.6, memory_approaching),
            ],
        },
        ThresholdRule {
            root_cause: RootCauseType::CpuThrottling,
            tiers: vec![
                tier(MetricKind::CpuThrottling, 70.0, 0.8, cpu_throttling_at),
                tier(MetricKind::CpuUsage, 90.0, 0.5, cpu_high),
            ],
        },
        ThresholdRule {
            root_cause: RootCauseType::DiskPressure,
            tiers: vec![
                tier(MetricKind::DiskUsage, 95.0, 0.85, disk_at),
                tier(MetricKind::DiskUsage, 85.0, 0.5, disk_approaching),
            ],
        },
        ThresholdRule {
            root_cause: RootCauseType::NetworkError,
            tiers: vec![tier(MetricKind::NetworkErrorRate, 0.1, 0.7, network_error_rate)],
        },
        ThresholdRule {
            root_cause: RootCauseType::ConfigError,
            tiers: vec![tier(MetricKind::RestartCount, 5.0, 0.8, restarts)],
        },
    ]
}

pub struct ThresholdPredictor {
    rules: Vec<ThresholdRule>,
}

impl ThresholdPredictor {
    pub fn new() -> Self {
        Self::with_rules(default_threshold_rules())
    }

    pub fn with_rules(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }
}

impl Default for ThresholdPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl SubPredictor for ThresholdPredictor {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn evaluate(&self, metrics: &PredictionMetrics) -> Result<Option<SubPrediction>> {
        let current = &metrics.current;
        let mut prediction = SubPrediction::default();

        for rule in &self.rules {
            let fired = rule.tiers.iter().find_map(|tier| {
                tier.metric
                    .read(current)
                    .filter(|value| *value >= tier.threshold)
                    .map(|value| (tier, value))
            });
            if let Some((tier, value)) = fired {
                prediction.record(tier.probability, rule.root_cause, (tier.factor)(value));
            }
        }

        Ok(prediction.into_fired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricsSnapshot;

    fn evaluate(snapshot: MetricsSnapshot) -> Option<SubPrediction> {
        let metrics = PredictionMetrics {
            current: snapshot,
            history: Vec::new(),
        };
        ThresholdPredictor::new().evaluate(&metrics).unwrap()
    }

    #[test]
    fn test_critical_memory() {
        let prediction = evaluate(MetricsSnapshot::default().with_memory(97.0)).unwrap();
        assert_eq!(prediction.probability, 0.9);
        assert_eq!(prediction.failure_types, vec![RootCauseType::OomKiller]);
        assert_eq!(prediction.factors, vec!["Memory usage at 97%".to_string()]);
    }

    #[test]
    fn test_warning_memory() {
        let prediction = evaluate(MetricsSnapshot::default().with_memory(88.0)).unwrap();
        assert_eq!(prediction.probability, 0.6);
        assert_eq!(
            prediction.factors,
            vec!["Memory usage approaching limit (88%)".to_string()]
        );
    }

    #[test]
    fn test_cpu_usage_only_checked_without_throttling() {
        let prediction = evaluate(MetricsSnapshot::default().with_cpu(95.0, 75.0)).unwrap();
        assert_eq!(prediction.probability, 0.8);
        assert_eq!(prediction.factors, vec!["CPU throttling at 75%".to_string()]);

        let prediction = evaluate(MetricsSnapshot::default().with_cpu(95.0, 10.0)).unwrap();
        assert_eq!(prediction.probability, 0.5);
        assert_eq!(prediction.factors, vec!["High CPU usage (95%)".to_string()]);
    }

    #[test]
    fn test_probability_is_running_max() {
        let snapshot = MetricsSnapshot::default()
            .with_memory(86.0)
            .with_disk(96.0)
            .with_network_error_rate(0.125)
            .with_restart_count(7.0);
        let prediction = evaluate(snapshot).unwrap();

        assert_eq!(prediction.probability, 0.85);
        assert_eq!(
            prediction.failure_types,
            vec![
                RootCauseType::OomKiller,
                RootCauseType::DiskPressure,
                RootCauseType::NetworkError,
                RootCauseType::ConfigError,
            ]
        );
        assert!(prediction
            .factors
            .contains(&"Network error rate at 12.5%".to_string()));
        assert!(prediction.factors.contains(&"Pod restarted 7 times".to_string()));
    }

    #[test]
    fn test_below_thresholds() {
        let snapshot = MetricsSnapshot::default()
            .with_memory(50.0)
            .with_cpu(20.0, 5.0)
            .with_disk(40.0)
            .with_network_error_rate(0.01)
            .with_restart_count(1.0);
        assert!(evaluate(snapshot).is_none());
        assert!(evaluate(MetricsSnapshot::default()).is_none());
    }

    #[test]
    fn test_custom_rules() {
        let predictor = ThresholdPredictor::with_rules(vec![ThresholdRule {
            root_cause: RootCauseType::OomKiller,
            tiers: vec![tier(MetricKind::MemoryUsage, 50.0, 0.4, memory_at)],
        }]);
        let metrics = PredictionMetrics {
            current: MetricsSnapshot::default().with_memory(60.0),
            history: Vec::new(),
        };
        let prediction = predictor.evaluate(&metrics).unwrap().unwrap();
        assert_eq!(prediction.probability, 0.4);
    }
}
