//! Agent Custom Resource Definition.
//!
//! An Agent represents a long-running AI agent workload. The operator
//! materializes the spec as a Deployment, a Service, a ConfigMap and,
//! depending on the spec, a HorizontalPodAutoscaler and an Ingress.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Agent is the Schema for the agents API.
///
/// The spec carries user intent; the status subresource reflects the state
/// the controller last observed on the owned Deployment.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "agentic.ai",
    version = "v1",
    kind = "Agent",
    plural = "agents",
    shortname = "ag",
    namespaced,
    status = "AgentStatus",
    printcolumn = r#"{"name":"Provider", "type":"string", "jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Model", "type":"string", "jsonPath":".spec.model"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.replicaStatus.ready"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// LLM provider backing the agent.
    pub provider: AgentProvider,

    /// Model identifier within the selected provider (e.g. "gpt-4").
    pub model: String,

    /// System prompt defining the agent's persona and instructions.
    pub system_prompt: String,

    /// Reference to the Secret holding the provider API credential.
    pub api_secret_ref: SecretKeyRef,

    /// Custom endpoint URL for self-hosted providers (vllm, ollama).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Execution framework. "direct" issues plain API calls, "langgraph"
    /// runs a workflow graph. Defaulted to "direct" at admission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<AgentFramework>,

    /// Workflow graph definition, required when framework is "langgraph".
    /// Carried as an opaque payload; the agent container interprets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langgraph_config: Option<serde_json::Value>,

    /// Tools available to the agent, propagated verbatim to the container.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Number of agent pod replicas, 1..=10. Defaulted to 1 at admission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// CPU/memory requests and limits for the agent pods. Defaulted at
    /// admission when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<AgentResources>,

    /// Kind of Service exposing the agent. Defaulted to ClusterIP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceKind>,

    /// Container image for the agent runtime. Falls back to the operator's
    /// configured default image when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl AgentSpec {
    /// Replica count with the admission default applied.
    pub fn replica_count(&self) -> i32 {
        self.replicas.unwrap_or(1)
    }

    /// Framework with the admission default applied.
    pub fn framework(&self) -> AgentFramework {
        self.framework.unwrap_or_default()
    }

    /// Service kind with the admission default applied.
    pub fn service_kind(&self) -> ServiceKind {
        self.service_type.unwrap_or_default()
    }
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentProvider {
    /// OpenAI hosted models.
    Openai,
    /// Anthropic Claude models.
    Claude,
    /// Google Gemini models.
    Gemini,
    /// Self-hosted vLLM endpoint.
    Vllm,
    /// Self-hosted Ollama endpoint.
    Ollama,
}

impl AgentProvider {
    /// Wire name of the provider as it appears in the resource.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Vllm => "vllm",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for AgentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent execution framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentFramework {
    /// Plain provider API calls.
    #[default]
    Direct,
    /// LangGraph workflow execution.
    Langgraph,
}

impl AgentFramework {
    /// Wire name of the framework.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Langgraph => "langgraph",
        }
    }
}

impl std::fmt::Display for AgentFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of Service created for the agent endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ServiceKind {
    /// Cluster-internal virtual IP.
    #[default]
    ClusterIP,
    /// Port on every node.
    NodePort,
    /// Cloud load balancer (also triggers Ingress creation).
    LoadBalancer,
}

impl ServiceKind {
    /// Wire name of the service type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClusterIP => "ClusterIP",
            Self::NodePort => "NodePort",
            Self::LoadBalancer => "LoadBalancer",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a key within a Secret in the Agent's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Name of the Secret.
    pub name: String,
    /// Key within the Secret's data.
    pub key: String,
}

/// A tool the agent may invoke. The operator propagates tools verbatim;
/// only the agent container interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    /// Unique tool identifier.
    pub name: String,
    /// Human-readable description used by the model for tool selection.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// CPU/memory requests and limits for the agent pods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentResources {
    /// Resource requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceSpec>,
    /// Resource limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceSpec>,
}

/// CPU and memory quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// CPU quantity (e.g. "100m", "1").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory quantity (e.g. "256Mi", "1Gi").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Lifecycle phase of an Agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AgentPhase {
    /// Resources are being created or are not yet ready.
    #[default]
    Pending,
    /// All desired replicas are ready.
    Running,
    /// A terminal precondition failed; user intervention required.
    Failed,
    /// Reserved, unused by normal operation.
    Succeeded,
}

/// Status of a condition, mirroring the Kubernetes convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition could not be evaluated.
    Unknown,
}

/// Type of an Agent condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AgentConditionType {
    /// The agent is ready to serve requests.
    Ready,
    /// The agent's deployment is progressing.
    Progressing,
    /// A terminal precondition failed.
    Degraded,
}

/// A typed observation about the Agent's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentCondition {
    /// Type of condition.
    #[serde(rename = "type")]
    pub condition_type: AgentConditionType,

    /// Status of the condition.
    pub status: ConditionStatus,

    /// Machine-readable reason for the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message about the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned between statuses (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Replica counts mirrored from the owned Deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaStatus {
    /// Desired replica count declared on the Deployment.
    pub desired: i32,
    /// Replicas ready to serve requests.
    pub ready: i32,
    /// Replicas available per the Deployment's availability criteria.
    pub available: i32,
}

/// Observed state of an Agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Current lifecycle phase.
    #[serde(default)]
    pub phase: AgentPhase,

    /// Human-readable explanation of the current phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Replica counts at last observation.
    #[serde(default)]
    pub replica_status: ReplicaStatus,

    /// Timestamp of the most recent status write (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Latest available observations of the agent's state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<AgentCondition>,
}
