//! Declarative rule tables for root-cause detection
//!
//! Detectors read these tables at construction time; nothing here is
//! evaluated directly.

use crate::models::{MetricsSnapshot, RootCauseType};

/// Confidence for OOM event reasons
pub const OOM_EVENT_CONFIDENCE: f64 = 0.95;
/// Confidence for every other mapped event reason
pub const EVENT_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, Copy)]
pub struct EventReasonRule {
    pub reason: &'static str,
    pub root_cause: RootCauseType,
    pub confidence: f64,
}

/// Exact event reason matches.
///
/// CrashLoopBackOff maps to ConfigError as a default; the crash itself
/// says nothing about the cause.
pub const EVENT_REASON_RULES: &[EventReasonRule] = &[
    EventReasonRule {
        reason: "OOMKilling",
        root_cause: RootCauseType::OomKiller,
        confidence: OOM_EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "OOMKilled",
        root_cause: RootCauseType::OomKiller,
        confidence: OOM_EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "FailedScheduling",
        root_cause: RootCauseType::ResourceLimit,
        confidence: EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "ImagePullBackOff",
        root_cause: RootCauseType::ImagePullError,
        confidence: EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "ErrImagePull",
        root_cause: RootCauseType::ImagePullError,
        confidence: EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "CrashLoopBackOff",
        root_cause: RootCauseType::ConfigError,
        confidence: EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "FailedMount",
        root_cause: RootCauseType::VolumeError,
        confidence: EVENT_CONFIDENCE,
    },
    EventReasonRule {
        reason: "FailedAttachVolume",
        root_cause: RootCauseType::VolumeError,
        confidence: EVENT_CONFIDENCE,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct LogPatternRule {
    /// Matched case-insensitively, line by line
    pub pattern: &'static str,
    pub root_cause: RootCauseType,
    pub description: &'static str,
    pub weight: f64,
}

pub const LOG_PATTERN_RULES: &[LogPatternRule] = &[
    LogPatternRule {
        pattern: r"out of memory|oom|memory.*exhausted",
        root_cause: RootCauseType::OomKiller,
        description: "OOM indicator",
        weight: 2.0,
    },
    LogPatternRule {
        pattern: r"killed.*signal 9|sigkill",
        root_cause: RootCauseType::OomKiller,
        description: "SIGKILL",
        weight: 1.5,
    },
    LogPatternRule {
        pattern: r"exit code 137",
        root_cause: RootCauseType::OomKiller,
        description: "Exit code 137 (OOMKilled)",
        weight: 2.0,
    },
    LogPatternRule {
        pattern: r"connection refused|connection timeout",
        root_cause: RootCauseType::NetworkError,
        description: "Connection error",
        weight: 1.5,
    },
    LogPatternRule {
        pattern: r"cannot pull image|pull.*failed|image pull back",
        root_cause: RootCauseType::ImagePullError,
        description: "Image pull failure",
        weight: 2.0,
    },
    LogPatternRule {
        pattern: r"config.*not found|missing.*environment|env.*required",
        root_cause: RootCauseType::ConfigError,
        description: "Configuration issue",
        weight: 1.5,
    },
    LogPatternRule {
        pattern: r"permission denied|forbidden|unauthorized",
        root_cause: RootCauseType::ConfigError,
        description: "Permission issue",
        weight: 1.5,
    },
    LogPatternRule {
        pattern: r"no space left|disk.*full",
        root_cause: RootCauseType::DiskPressure,
        description: "Disk space issue",
        weight: 2.0,
    },
    LogPatternRule {
        pattern: r"panic|fatal error|segmentation fault",
        root_cause: RootCauseType::ConfigError,
        description: "Application crash",
        weight: 1.5,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct LogKeywordRule {
    /// Lowercase; counted as non-overlapping substrings of the lowercased log
    pub keyword: &'static str,
    pub root_cause: RootCauseType,
    pub weight: f64,
}

pub const LOG_KEYWORD_RULES: &[LogKeywordRule] = &[
    LogKeywordRule { keyword: "oom", root_cause: RootCauseType::OomKiller, weight: 2.0 },
    LogKeywordRule { keyword: "killed", root_cause: RootCauseType::OomKiller, weight: 1.0 },
    LogKeywordRule { keyword: "timeout", root_cause: RootCauseType::NetworkError, weight: 1.5 },
    LogKeywordRule { keyword: "refused", root_cause: RootCauseType::NetworkError, weight: 1.5 },
    LogKeywordRule { keyword: "image", root_cause: RootCauseType::ImagePullError, weight: 1.0 },
    LogKeywordRule { keyword: "volume", root_cause: RootCauseType::VolumeError, weight: 1.5 },
    LogKeywordRule { keyword: "disk", root_cause: RootCauseType::DiskPressure, weight: 1.0 },
    LogKeywordRule { keyword: "cpu", root_cause: RootCauseType::CpuThrottling, weight: 1.0 },
    LogKeywordRule { keyword: "config", root_cause: RootCauseType::ConfigError, weight: 1.0 },
    LogKeywordRule { keyword: "panic", root_cause: RootCauseType::ConfigError, weight: 1.5 },
];

/// Scalar readings the metric rules can inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    MemoryUsage,
    CpuUsage,
    CpuThrottling,
    DiskUsage,
    NetworkErrorRate,
    RestartCount,
}

impl MetricKind {
    pub fn read(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        match self {
            MetricKind::MemoryUsage => snapshot.memory_usage(),
            MetricKind::CpuUsage => snapshot.cpu_usage(),
            MetricKind::CpuThrottling => snapshot.cpu_throttling(),
            MetricKind::DiskUsage => snapshot.disk_usage(),
            MetricKind::NetworkErrorRate => snapshot.network_error_rate(),
            MetricKind::RestartCount => snapshot.restart_count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricThresholdRule {
    pub metric: MetricKind,
    pub threshold: f64,
    pub root_cause: RootCauseType,
    pub confidence: f64,
    /// Evidence prefix, rendered as "<label> at <value>%"
    pub label: &'static str,
    pub description: &'static str,
}

/// Evaluated in order; the first rule whose reading reaches its threshold wins
pub const METRIC_THRESHOLD_RULES: &[MetricThresholdRule] = &[
    MetricThresholdRule {
        metric: MetricKind::MemoryUsage,
        threshold: 95.0,
        root_cause: RootCauseType::OomKiller,
        confidence: 0.9,
        label: "Memory usage",
        description: "Memory usage exceeded limits",
    },
    MetricThresholdRule {
        metric: MetricKind::CpuThrottling,
        threshold: 50.0,
        root_cause: RootCauseType::CpuThrottling,
        confidence: 0.85,
        label: "CPU throttling",
        description: "CPU throttling detected",
    },
    MetricThresholdRule {
        metric: MetricKind::DiskUsage,
        threshold: 90.0,
        root_cause: RootCauseType::DiskPressure,
        confidence: 0.85,
        label: "Disk usage",
        description: "Disk space exhausted",
    },
];

/// Human-readable description of a root cause category
pub fn describe(root_cause: RootCauseType) -> &'static str {
    match root_cause {
        RootCauseType::OomKiller => "Container was killed due to out of memory (OOM)",
        RootCauseType::CpuThrottling => "CPU throttling due to resource limits",
        RootCauseType::DiskPressure => "Disk space exhausted or I/O bottleneck",
        RootCauseType::NetworkError => "Network connectivity or DNS resolution error",
        RootCauseType::ConfigError => "Configuration error or missing environment variable",
        RootCauseType::ImagePullError => "Failed to pull container image",
        RootCauseType::VolumeError => "Volume mount or attachment failure",
        RootCauseType::DependencyError => "External service dependency failure",
        RootCauseType::ResourceLimit => "Resource quota exceeded or scheduling constraint",
        RootCauseType::Unknown => "Unable to determine specific root cause",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_event_reasons_unique() {
        let reasons: HashSet<_> = EVENT_REASON_RULES.iter().map(|r| r.reason).collect();
        assert_eq!(reasons.len(), EVENT_REASON_RULES.len());
    }

    #[test]
    fn test_only_oom_events_use_high_confidence() {
        for rule in EVENT_REASON_RULES {
            let expected = if rule.root_cause == RootCauseType::OomKiller {
                OOM_EVENT_CONFIDENCE
            } else {
                EVENT_CONFIDENCE
            };
            assert_eq!(rule.confidence, expected, "{}", rule.reason);
        }
    }

    #[test]
    fn test_log_patterns_compile() {
        for rule in LOG_PATTERN_RULES {
            assert!(regex::Regex::new(rule.pattern).is_ok(), "{}", rule.pattern);
            assert!(rule.weight > 0.0);
        }
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for rule in LOG_KEYWORD_RULES {
            assert_eq!(rule.keyword, rule.keyword.to_lowercase());
        }
    }

    #[test]
    fn test_every_type_has_description() {
        for t in RootCauseType::ALL {
            assert!(!describe(t).is_empty());
        }
    }

    #[test]
    fn test_metric_kind_read() {
        let snapshot = MetricsSnapshot::default()
            .with_memory(80.0)
            .with_cpu(40.0, 10.0)
            .with_restart_count(2.0);

        assert_eq!(MetricKind::MemoryUsage.read(&snapshot), Some(80.0));
        assert_eq!(MetricKind::CpuThrottling.read(&snapshot), Some(10.0));
        assert_eq!(MetricKind::DiskUsage.read(&snapshot), None);
        assert_eq!(MetricKind::RestartCount.read(&snapshot), Some(2.0));
    }
}
