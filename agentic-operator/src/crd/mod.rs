//! Custom Resource Definitions for the Agentic operator.
//!
//! A single CRD is managed:
//!
//! - [`Agent`]: a declarative description of an AI agent workload

mod agent;

pub use agent::{
    Agent, AgentCondition, AgentConditionType, AgentFramework, AgentPhase, AgentProvider,
    AgentResources, AgentSpec, AgentStatus, ConditionStatus, ReplicaStatus, ResourceSpec,
    SecretKeyRef, ServiceKind, ToolSpec,
};

/// API group of the [`Agent`] resource.
pub const API_GROUP: &str = "agentic.ai";

/// Full `apiVersion` of the [`Agent`] resource.
pub const API_VERSION: &str = "agentic.ai/v1";

/// Finalizer the controller holds on every managed [`Agent`].
pub const FINALIZER: &str = "agentic.ai/finalizer";
