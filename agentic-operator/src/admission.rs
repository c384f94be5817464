//! Admission-time validation and defaulting for Agent resources.
//!
//! The webhook binary serves these handlers on the API server's admission
//! path; the reconciler re-runs [`validate`] on every pass so that a
//! disabled or bypassed webhook cannot smuggle an invalid spec past the
//! controller.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::crd::{Agent, AgentFramework, AgentResources, AgentSpec, ResourceSpec, ServiceKind};
use crate::error::{OperatorError, OperatorResult};

/// Minimum allowed replica count.
pub const MIN_REPLICAS: i32 = 1;

/// Maximum allowed replica count.
pub const MAX_REPLICAS: i32 = 10;

/// Default CPU request applied when the spec carries no resource record.
pub const DEFAULT_CPU_REQUEST: &str = "100m";
/// Default memory request applied when the spec carries no resource record.
pub const DEFAULT_MEMORY_REQUEST: &str = "256Mi";
/// Default CPU limit applied when the spec carries no resource record.
pub const DEFAULT_CPU_LIMIT: &str = "200m";
/// Default memory limit applied when the spec carries no resource record.
pub const DEFAULT_MEMORY_LIMIT: &str = "512Mi";

/// Validate an Agent spec against the admission rules.
///
/// All violations are collected into a single error message so the user
/// sees every problem at once. Enumerated fields (provider, framework,
/// serviceType) are enforced by the schema and by deserialization before
/// this function runs.
pub fn validate(spec: &AgentSpec) -> OperatorResult<()> {
    let violations = collect_violations(spec);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(OperatorError::InvalidSpec(violations.join("; ")))
    }
}

fn collect_violations(spec: &AgentSpec) -> Vec<String> {
    let mut violations = Vec::new();

    if spec.model.is_empty() {
        violations.push("spec.model is required".to_string());
    }

    if spec.system_prompt.is_empty() {
        violations.push("spec.systemPrompt is required".to_string());
    }

    if spec.api_secret_ref.name.is_empty() {
        violations.push("spec.apiSecretRef.name is required".to_string());
    }

    if spec.api_secret_ref.key.is_empty() {
        violations.push("spec.apiSecretRef.key is required".to_string());
    }

    if spec.framework() == AgentFramework::Langgraph && spec.langgraph_config.is_none() {
        violations
            .push("spec.langgraphConfig is required when framework is 'langgraph'".to_string());
    }

    if let Some(replicas) = spec.replicas {
        if !(MIN_REPLICAS..=MAX_REPLICAS).contains(&replicas) {
            violations.push(format!(
                "spec.replicas must be between {MIN_REPLICAS} and {MAX_REPLICAS}, got {replicas}"
            ));
        }
    }

    violations
}

/// The resource record substituted when the spec declares none.
pub fn default_resources() -> AgentResources {
    AgentResources {
        requests: Some(ResourceSpec {
            cpu: Some(DEFAULT_CPU_REQUEST.to_string()),
            memory: Some(DEFAULT_MEMORY_REQUEST.to_string()),
        }),
        limits: Some(ResourceSpec {
            cpu: Some(DEFAULT_CPU_LIMIT.to_string()),
            memory: Some(DEFAULT_MEMORY_LIMIT.to_string()),
        }),
    }
}

/// Apply admission defaults in place. Never overwrites a user-supplied
/// value, so re-defaulting an already-defaulted spec is a no-op.
pub fn apply_defaults(spec: &mut AgentSpec) {
    if spec.framework.is_none() {
        spec.framework = Some(AgentFramework::Direct);
    }
    if spec.replicas.is_none() {
        spec.replicas = Some(1);
    }
    if spec.service_type.is_none() {
        spec.service_type = Some(ServiceKind::ClusterIP);
    }
    if spec.resources.is_none() {
        spec.resources = Some(default_resources());
    }
}

/// JSON Patch operations that bring an incoming spec to its defaulted
/// form. Empty when the spec is already fully defaulted.
pub fn defaulting_patch(spec: &AgentSpec) -> Vec<serde_json::Value> {
    let mut ops = Vec::new();

    if spec.framework.is_none() {
        ops.push(serde_json::json!({
            "op": "add",
            "path": "/spec/framework",
            "value": AgentFramework::Direct.as_str(),
        }));
    }
    if spec.replicas.is_none() {
        ops.push(serde_json::json!({
            "op": "add",
            "path": "/spec/replicas",
            "value": 1,
        }));
    }
    if spec.service_type.is_none() {
        ops.push(serde_json::json!({
            "op": "add",
            "path": "/spec/serviceType",
            "value": ServiceKind::ClusterIP.as_str(),
        }));
    }
    if spec.resources.is_none() {
        ops.push(serde_json::json!({
            "op": "add",
            "path": "/spec/resources",
            "value": default_resources(),
        }));
    }

    ops
}

/// Kubernetes admission review envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionReview {
    /// Envelope apiVersion, echoed back in responses.
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Envelope kind, echoed back in responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Incoming admission request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    /// Outgoing admission response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// The request half of an admission review.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionRequest {
    /// Unique request identifier, echoed in the response.
    pub uid: String,
    /// Operation being admitted (CREATE, UPDATE, DELETE).
    #[serde(default)]
    pub operation: String,
    /// The incoming object, left untyped until parsed.
    #[serde(default)]
    pub object: Option<serde_json::Value>,
}

/// The response half of an admission review.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionResponse {
    /// Request identifier this response answers.
    pub uid: String,
    /// Whether the object is admitted.
    pub allowed: bool,
    /// Rejection details when not allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
    /// Base64-encoded JSON Patch applied by a mutating webhook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    /// Patch encoding, always "JSONPatch" when a patch is present.
    #[serde(
        rename = "patchType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub patch_type: Option<String>,
}

/// Status details attached to a rejection.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionStatus {
    /// HTTP-style status code.
    pub code: i32,
    /// Rejection message shown to the user.
    pub message: String,
}

const REVIEW_API_VERSION: &str = "admission.k8s.io/v1";
const REVIEW_KIND: &str = "AdmissionReview";

fn respond(response: AdmissionResponse) -> AdmissionReview {
    AdmissionReview {
        api_version: Some(REVIEW_API_VERSION.to_string()),
        kind: Some(REVIEW_KIND.to_string()),
        request: None,
        response: Some(response),
    }
}

fn allow(uid: String) -> AdmissionResponse {
    AdmissionResponse {
        uid,
        allowed: true,
        status: None,
        patch: None,
        patch_type: None,
    }
}

fn deny(uid: String, message: String) -> AdmissionResponse {
    AdmissionResponse {
        uid,
        allowed: false,
        status: Some(AdmissionStatus { code: 422, message }),
        patch: None,
        patch_type: None,
    }
}

fn parse_agent(request: &AdmissionRequest) -> Result<Agent, String> {
    let object = request
        .object
        .clone()
        .ok_or_else(|| "admission request carries no object".to_string())?;
    serde_json::from_value(object).map_err(|err| format!("invalid Agent object: {err}"))
}

/// Handle a mutating admission review: admit and attach a JSON Patch that
/// fills in the admission defaults.
pub fn mutate_review(review: AdmissionReview) -> AdmissionReview {
    let Some(request) = review.request else {
        return respond(deny(
            String::new(),
            "AdmissionReview missing request".to_string(),
        ));
    };

    let agent = match parse_agent(&request) {
        Ok(agent) => agent,
        Err(message) => return respond(deny(request.uid, message)),
    };

    let ops = defaulting_patch(&agent.spec);
    if ops.is_empty() {
        return respond(allow(request.uid));
    }

    let patch = match serde_json::to_vec(&ops) {
        Ok(bytes) => BASE64.encode(bytes),
        Err(err) => {
            return respond(deny(
                request.uid,
                format!("failed to encode defaulting patch: {err}"),
            ))
        }
    };

    let mut response = allow(request.uid);
    response.patch = Some(patch);
    response.patch_type = Some("JSONPatch".to_string());
    respond(response)
}

/// Handle a validating admission review: admit or deny based on the spec
/// rules. Objects that fail to deserialize (unknown provider, framework or
/// service type) are denied with the parser's message.
pub fn validate_review(review: AdmissionReview) -> AdmissionReview {
    let Some(request) = review.request else {
        return respond(deny(
            String::new(),
            "AdmissionReview missing request".to_string(),
        ));
    };

    let agent = match parse_agent(&request) {
        Ok(agent) => agent,
        Err(message) => return respond(deny(request.uid, message)),
    };

    match validate(&agent.spec) {
        Ok(()) => respond(allow(request.uid)),
        Err(err) => respond(deny(request.uid, err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AgentProvider, SecretKeyRef};

    fn valid_spec() -> AgentSpec {
        AgentSpec {
            provider: AgentProvider::Openai,
            model: "gpt-4".to_string(),
            system_prompt: "hi".to_string(),
            api_secret_ref: SecretKeyRef {
                name: "s".to_string(),
                key: "k".to_string(),
            },
            endpoint: None,
            framework: None,
            langgraph_config: None,
            tools: vec![],
            replicas: None,
            resources: None,
            service_type: None,
            image: None,
        }
    }

    fn agent_json(spec: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "agentic.ai/v1",
            "kind": "Agent",
            "metadata": {"name": "test-agent", "namespace": "default"},
            "spec": spec,
        })
    }

    fn review_for(object: serde_json::Value) -> AdmissionReview {
        AdmissionReview {
            api_version: Some("admission.k8s.io/v1".to_string()),
            kind: Some("AdmissionReview".to_string()),
            request: Some(AdmissionRequest {
                uid: "uid-1".to_string(),
                operation: "CREATE".to_string(),
                object: Some(object),
            }),
            response: None,
        }
    }

    #[test]
    fn valid_spec_passes() {
        assert!(validate(&valid_spec()).is_ok());
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut spec = valid_spec();
        spec.model = String::new();
        let err = validate(&spec).unwrap_err();
        assert!(err.to_string().contains("spec.model"));
    }

    #[test]
    fn empty_system_prompt_is_rejected() {
        let mut spec = valid_spec();
        spec.system_prompt = String::new();
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn empty_secret_ref_fields_are_rejected_together() {
        let mut spec = valid_spec();
        spec.api_secret_ref.name = String::new();
        spec.api_secret_ref.key = String::new();
        let message = validate(&spec).unwrap_err().to_string();
        assert!(message.contains("spec.apiSecretRef.name"));
        assert!(message.contains("spec.apiSecretRef.key"));
    }

    #[test]
    fn langgraph_requires_config() {
        let mut spec = valid_spec();
        spec.framework = Some(AgentFramework::Langgraph);
        let err = validate(&spec).unwrap_err();
        assert!(err.to_string().contains("langgraphConfig"));

        spec.langgraph_config = Some(serde_json::json!({"entrypoint": "start"}));
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn replica_boundaries() {
        let mut spec = valid_spec();

        spec.replicas = Some(1);
        assert!(validate(&spec).is_ok());

        spec.replicas = Some(10);
        assert!(validate(&spec).is_ok());

        spec.replicas = Some(0);
        assert!(validate(&spec).is_err());

        spec.replicas = Some(11);
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn defaults_fill_unset_fields_only() {
        let mut spec = valid_spec();
        spec.replicas = Some(3);
        apply_defaults(&mut spec);

        assert_eq!(spec.framework, Some(AgentFramework::Direct));
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.service_type, Some(ServiceKind::ClusterIP));

        let resources = spec.resources.as_ref().unwrap();
        let requests = resources.requests.as_ref().unwrap();
        assert_eq!(requests.cpu.as_deref(), Some("100m"));
        assert_eq!(requests.memory.as_deref(), Some("256Mi"));
        let limits = resources.limits.as_ref().unwrap();
        assert_eq!(limits.cpu.as_deref(), Some("200m"));
        assert_eq!(limits.memory.as_deref(), Some("512Mi"));
    }

    #[test]
    fn defaulting_is_idempotent() {
        let mut once = valid_spec();
        apply_defaults(&mut once);

        let mut twice = once.clone();
        apply_defaults(&mut twice);

        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
        assert!(defaulting_patch(&once).is_empty());
    }

    #[test]
    fn defaulting_patch_covers_missing_fields() {
        let spec = valid_spec();
        let ops = defaulting_patch(&spec);

        let paths: Vec<&str> = ops
            .iter()
            .map(|op| op["path"].as_str().unwrap())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/spec/framework",
                "/spec/replicas",
                "/spec/serviceType",
                "/spec/resources"
            ]
        );
        assert!(ops.iter().all(|op| op["op"] == "add"));
    }

    #[test]
    fn mutate_review_attaches_base64_json_patch() {
        let review = review_for(agent_json(serde_json::json!({
            "provider": "openai",
            "model": "gpt-4",
            "systemPrompt": "hi",
            "apiSecretRef": {"name": "s", "key": "k"},
        })));

        let out = mutate_review(review);
        let response = out.response.unwrap();
        assert!(response.allowed);
        assert_eq!(response.uid, "uid-1");
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));

        let decoded = BASE64.decode(response.patch.unwrap()).unwrap();
        let ops: Vec<serde_json::Value> = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn mutate_review_without_missing_fields_sends_no_patch() {
        let mut spec = valid_spec();
        apply_defaults(&mut spec);
        let review = review_for(agent_json(serde_json::to_value(&spec).unwrap()));

        let response = mutate_review(review).response.unwrap();
        assert!(response.allowed);
        assert!(response.patch.is_none());
    }

    #[test]
    fn validate_review_denies_unknown_provider() {
        let review = review_for(agent_json(serde_json::json!({
            "provider": "cohere",
            "model": "command-r",
            "systemPrompt": "hi",
            "apiSecretRef": {"name": "s", "key": "k"},
        })));

        let response = validate_review(review).response.unwrap();
        assert!(!response.allowed);
        assert!(response.status.unwrap().message.contains("invalid Agent"));
    }

    #[test]
    fn validate_review_denies_langgraph_without_config() {
        let review = review_for(agent_json(serde_json::json!({
            "provider": "claude",
            "model": "claude-sonnet-4",
            "systemPrompt": "hi",
            "apiSecretRef": {"name": "s", "key": "k"},
            "framework": "langgraph",
        })));

        let response = validate_review(review).response.unwrap();
        assert!(!response.allowed);
    }

    #[test]
    fn validate_review_allows_valid_agent() {
        let review = review_for(agent_json(serde_json::json!({
            "provider": "vllm",
            "model": "llama-3-70b",
            "systemPrompt": "hi",
            "apiSecretRef": {"name": "s", "key": "k"},
            "endpoint": "http://vllm.inference.svc:8000",
        })));

        let response = validate_review(review).response.unwrap();
        assert!(response.allowed);
        assert!(response.status.is_none());
    }

    #[test]
    fn review_without_request_is_denied() {
        let review = AdmissionReview {
            api_version: None,
            kind: None,
            request: None,
            response: None,
        };
        let response = validate_review(review).response.unwrap();
        assert!(!response.allowed);
    }
}
