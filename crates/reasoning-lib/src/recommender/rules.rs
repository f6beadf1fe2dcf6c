//! Static remediation rule table, keyed by root cause type

use crate::models::{Evidence, RiskLevel, RootCauseType};

/// Gate on a rule; all conditions of a rule must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// An event is present and its reason equals this value
    EventReason(&'static str),
    /// Metrics were supplied with the evidence
    RequiresMetrics,
}

impl RuleCondition {
    pub fn holds(&self, evidence: &Evidence) -> bool {
        match self {
            RuleCondition::EventReason(reason) => evidence.event_reason() == Some(*reason),
            RuleCondition::RequiresMetrics => evidence.has_metrics(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendationRule {
    pub action: &'static str,
    pub description: &'static str,
    /// Multiplied by the verdict confidence
    pub confidence: f64,
    pub risk: RiskLevel,
    pub impact: &'static str,
    pub steps: &'static [&'static str],
    pub rollback_steps: Option<&'static [&'static str]>,
    pub estimated_duration: Option<&'static str>,
    pub metadata: &'static [(&'static str, &'static str)],
    pub conditions: &'static [RuleCondition],
}

impl RecommendationRule {
    pub fn applies(&self, evidence: &Evidence) -> bool {
        self.conditions.iter().all(|c| c.holds(evidence))
    }
}

const OOM_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "increase_memory_limit",
        description: "Increase container memory limits to prevent OOM kills",
        confidence: 0.95,
        risk: RiskLevel::Low,
        impact: "Prevents future OOM kills, may increase cluster resource usage",
        steps: &[
            "Analyze current memory usage patterns",
            "Calculate recommended memory limit (current + 50%)",
            "Update Deployment/StatefulSet memory limits",
            "kubectl apply -f updated-manifest.yaml",
            "Monitor for OOM recurrence",
        ],
        rollback_steps: Some(&[
            "Revert to previous memory limits",
            "kubectl rollout undo deployment/<name>",
        ]),
        estimated_duration: Some("5 minutes"),
        metadata: &[("suggested_increase", "50%"), ("monitor_period", "24h")],
        conditions: &[],
    },
    RecommendationRule {
        action: "add_memory_request",
        description: "Set appropriate memory requests for better scheduling",
        confidence: 0.85,
        risk: RiskLevel::Low,
        impact: "Improves pod scheduling and resource guarantees",
        steps: &[
            "Calculate 80th percentile memory usage",
            "Set memory request to P80 value",
            "Update pod spec with requests",
            "Apply changes and monitor",
        ],
        rollback_steps: None,
        estimated_duration: Some("5 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "optimize_application",
        description: "Optimize application memory usage",
        confidence: 0.70,
        risk: RiskLevel::Medium,
        impact: "Reduces memory footprint but requires code changes",
        steps: &[
            "Profile application memory usage",
            "Identify memory leaks or inefficiencies",
            "Optimize code or dependencies",
            "Test changes in staging",
            "Deploy to production",
        ],
        rollback_steps: None,
        estimated_duration: Some("Several hours to days"),
        metadata: &[],
        conditions: &[],
    },
];

const CPU_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "increase_cpu_limit",
        description: "Increase CPU limits to reduce throttling",
        confidence: 0.90,
        risk: RiskLevel::Low,
        impact: "Improves application performance",
        steps: &[
            "Analyze CPU usage patterns",
            "Increase CPU limit by 50-100%",
            "Update deployment manifest",
            "Apply changes",
            "Monitor throttling metrics",
        ],
        rollback_steps: None,
        estimated_duration: Some("5 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "optimize_workload",
        description: "Optimize CPU-intensive operations",
        confidence: 0.75,
        risk: RiskLevel::Medium,
        impact: "Reduces CPU usage through code optimization",
        steps: &[
            "Profile CPU usage",
            "Identify hotspots",
            "Optimize algorithms or add caching",
            "Test performance improvements",
        ],
        rollback_steps: None,
        estimated_duration: Some("Hours to days"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "configure_horizontal_autoscaling",
        description: "Scale out on CPU utilization instead of raising limits",
        confidence: 0.70,
        risk: RiskLevel::Medium,
        impact: "Spreads load across replicas during CPU peaks",
        steps: &[
            "Confirm the workload is stateless or supports multiple replicas",
            "kubectl autoscale deployment/<name> --cpu-percent=70 --min=2 --max=10",
            "Verify HorizontalPodAutoscaler targets: kubectl get hpa",
            "Watch throttling and replica count over a peak period",
        ],
        rollback_steps: Some(&["kubectl delete hpa <name>"]),
        estimated_duration: Some("15 minutes"),
        metadata: &[("target_cpu_percent", "70")],
        conditions: &[RuleCondition::RequiresMetrics],
    },
];

const IMAGE_PULL_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "fix_image_reference",
        description: "Correct image name or tag",
        confidence: 0.95,
        risk: RiskLevel::Low,
        impact: "Resolves image pull failures",
        steps: &[
            "Verify image exists in registry",
            "Check image name and tag spelling",
            "Update deployment with correct image",
            "kubectl apply -f deployment.yaml",
        ],
        rollback_steps: None,
        estimated_duration: Some("2 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "configure_image_pull_secret",
        description: "Add or update image pull secrets for private registry",
        confidence: 0.90,
        risk: RiskLevel::Low,
        impact: "Enables pulling from private registries",
        steps: &[
            "Create docker-registry secret",
            "kubectl create secret docker-registry regcred --docker-server=<registry> ...",
            "Add imagePullSecrets to pod spec",
            "Apply updated manifest",
        ],
        rollback_steps: None,
        estimated_duration: Some("5 minutes"),
        metadata: &[],
        conditions: &[],
    },
];

const CONFIG_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "fix_configuration",
        description: "Correct application configuration or environment variables",
        confidence: 0.85,
        risk: RiskLevel::Medium,
        impact: "Resolves configuration-related crashes",
        steps: &[
            "Review application logs for config errors",
            "Identify missing or incorrect configuration",
            "Update ConfigMap or Secret",
            "Restart pods to pick up new config",
        ],
        rollback_steps: None,
        estimated_duration: Some("10 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "add_missing_env_vars",
        description: "Add required environment variables",
        confidence: 0.80,
        risk: RiskLevel::Low,
        impact: "Provides required configuration to application",
        steps: &[
            "Identify missing environment variables from logs",
            "Add env vars to deployment spec",
            "kubectl apply updated deployment",
            "Verify pods start successfully",
        ],
        rollback_steps: None,
        estimated_duration: Some("5 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "inspect_crash_loop_logs",
        description: "Read the logs of the last crashed container",
        confidence: 0.75,
        risk: RiskLevel::Low,
        impact: "Pinpoints the startup failure behind the crash loop",
        steps: &[
            "kubectl logs <pod> --previous",
            "kubectl describe pod <pod> and check the last state exit code",
            "Fix the failing startup step",
            "Redeploy and watch the restart count",
        ],
        rollback_steps: None,
        estimated_duration: Some("10 minutes"),
        metadata: &[],
        conditions: &[RuleCondition::EventReason("CrashLoopBackOff")],
    },
];

const NETWORK_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "check_service_connectivity",
        description: "Verify network connectivity to dependent services",
        confidence: 0.85,
        risk: RiskLevel::Low,
        impact: "Identifies network connectivity issues",
        steps: &[
            "Check if target service is running",
            "Verify Service and Endpoints exist",
            "Test connectivity from pod: kubectl exec <pod> -- curl <service>",
            "Check NetworkPolicy rules",
        ],
        rollback_steps: None,
        estimated_duration: Some("10 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "fix_service_dns",
        description: "Resolve DNS resolution issues",
        confidence: 0.80,
        risk: RiskLevel::Low,
        impact: "Fixes DNS-related connectivity problems",
        steps: &[
            "Check CoreDNS pods are running",
            "Verify Service name is correct",
            "Test DNS resolution: kubectl exec <pod> -- nslookup <service>",
            "Check kube-dns Service",
        ],
        rollback_steps: None,
        estimated_duration: Some("15 minutes"),
        metadata: &[],
        conditions: &[],
    },
];

const VOLUME_RULES: &[RecommendationRule] = &[RecommendationRule {
    action: "fix_pvc_binding",
    description: "Resolve PersistentVolumeClaim binding issues",
    confidence: 0.90,
    risk: RiskLevel::Medium,
    impact: "Enables successful volume mounting",
    steps: &[
        "Check PVC status: kubectl get pvc",
        "Verify StorageClass exists",
        "Check available PersistentVolumes",
        "Verify node has volume plugin",
        "Check PVC access modes match PV",
    ],
    rollback_steps: None,
    estimated_duration: Some("15 minutes"),
    metadata: &[],
    conditions: &[],
}];

const DISK_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "cleanup_disk_space",
        description: "Free up disk space on node",
        confidence: 0.85,
        risk: RiskLevel::Medium,
        impact: "Resolves disk pressure condition",
        steps: &[
            "Identify large files or logs",
            "Remove unused container images: docker system prune",
            "Clean up old logs",
            "Verify disk usage: df -h",
        ],
        rollback_steps: None,
        estimated_duration: Some("10 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "increase_volume_size",
        description: "Expand PersistentVolume size",
        confidence: 0.80,
        risk: RiskLevel::Low,
        impact: "Provides more storage capacity",
        steps: &[
            "Check if StorageClass supports expansion",
            "Edit PVC to increase size",
            "Wait for volume expansion",
            "Verify new size: kubectl get pvc",
        ],
        rollback_steps: None,
        estimated_duration: Some("15 minutes"),
        metadata: &[],
        conditions: &[],
    },
];

const RESOURCE_LIMIT_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        action: "adjust_resource_quotas",
        description: "Increase namespace resource quotas",
        confidence: 0.90,
        risk: RiskLevel::Low,
        impact: "Allows pods to be scheduled",
        steps: &[
            "Check current quota: kubectl get resourcequota",
            "Calculate required resources",
            "Update ResourceQuota",
            "kubectl apply updated quota",
        ],
        rollback_steps: None,
        estimated_duration: Some("5 minutes"),
        metadata: &[],
        conditions: &[],
    },
    RecommendationRule {
        action: "add_node_capacity",
        description: "Add more nodes to cluster or increase node size",
        confidence: 0.85,
        risk: RiskLevel::Low,
        impact: "Increases cluster capacity",
        steps: &[
            "Evaluate current cluster capacity",
            "Add new nodes or scale node group",
            "Wait for nodes to become ready",
            "Verify pod scheduling",
        ],
        rollback_steps: None,
        estimated_duration: Some("10-30 minutes"),
        metadata: &[],
        conditions: &[],
    },
];

/// Ordered rules for a root cause. DependencyError and Unknown have none.
pub fn rules_for(root_cause: RootCauseType) -> &'static [RecommendationRule] {
    match root_cause {
        RootCauseType::OomKiller => OOM_RULES,
        RootCauseType::CpuThrottling => CPU_RULES,
        RootCauseType::ImagePullError => IMAGE_PULL_RULES,
        RootCauseType::ConfigError => CONFIG_RULES,
        RootCauseType::NetworkError => NETWORK_RULES,
        RootCauseType::VolumeError => VOLUME_RULES,
        RootCauseType::DiskPressure => DISK_RULES,
        RootCauseType::ResourceLimit => RESOURCE_LIMIT_RULES,
        RootCauseType::DependencyError | RootCauseType::Unknown => &[],
    }
}
