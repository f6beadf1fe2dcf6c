//! Failure reasoning library for Kubernetes workloads
//!
//! This crate provides the core functionality for:
//! - Root cause analysis from events, logs and metrics
//! - Failure prediction from metric history
//! - Ranked remediation recommendations
//! - Accuracy learning from operator feedback
//! - Historical case lookup
//! - Health checks and observability

pub mod analyzer;
pub mod engine;
pub mod health;
pub mod knowledge;
pub mod learning;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod recommender;

pub use engine::{EngineConfig, ReasoningEngine, RecommendationResponse};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use knowledge::{open_case_store, CaseStore, CaseStoreError, OpenedCaseStore};
pub use learning::{LearningError, LearningSystem};
pub use models::*;
pub use observability::{ReasoningMetrics, StructuredLogger};
