//! Builders for the Kubernetes objects owned by an Agent.
//!
//! Every builder is a pure function of the Agent and the operator
//! configuration: it never consults cluster state, so two calls with the
//! same inputs produce identical objects. The reconciler decides what to
//! do with the result.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, EnvVar, EnvVarSource, HTTPGetAction, PodSpec,
    PodTemplateSpec, Probe, ResourceRequirements, SecretKeySelector, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::admission;
use crate::config::OperatorConfig;
use crate::crd::{Agent, AgentResources, API_VERSION};
use crate::error::OperatorResult;

/// TCP port the agent container listens on.
pub const AGENT_PORT: i32 = 8080;

/// Port exposed by the agent Service.
pub const SERVICE_PORT: i32 = 80;

/// HPA scales up to this multiple of the declared replica count.
const HPA_MAX_FACTOR: i32 = 3;

/// Name of the Deployment owned by an Agent.
pub fn deployment_name(agent_name: &str) -> String {
    agent_name.to_string()
}

/// Name of the Service owned by an Agent.
pub fn service_name(agent_name: &str) -> String {
    format!("{agent_name}-service")
}

/// Name of the ConfigMap owned by an Agent.
pub fn configmap_name(agent_name: &str) -> String {
    format!("{agent_name}-config")
}

/// Name of the HorizontalPodAutoscaler owned by an Agent.
pub fn hpa_name(agent_name: &str) -> String {
    format!("{agent_name}-hpa")
}

/// Name of the Ingress owned by an Agent.
pub fn ingress_name(agent_name: &str) -> String {
    format!("{agent_name}-ingress")
}

/// Full label set stamped on every owned object.
pub fn labels(agent: &Agent) -> BTreeMap<String, String> {
    let name = agent.name_any();
    BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            "agentic-agent".to_string(),
        ),
        ("app.kubernetes.io/instance".to_string(), name.clone()),
        (
            "app.kubernetes.io/managed-by".to_string(),
            "agentic-operator".to_string(),
        ),
        ("agentic.ai/agent".to_string(), name),
    ])
}

/// Labels used to select agent pods. Kept to the instance label so the
/// selector survives additions to the full label set.
pub fn selector_labels(agent: &Agent) -> BTreeMap<String, String> {
    BTreeMap::from([(
        "app.kubernetes.io/instance".to_string(),
        agent.name_any(),
    )])
}

/// Controller owner reference pointing at the Agent. The garbage collector
/// cascades deletion of owned objects along this link.
pub fn owner_reference(agent: &Agent) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: "Agent".to_string(),
        name: agent.name_any(),
        uid: agent.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn metadata(agent: &Agent, name: String, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        labels: Some(labels(agent)),
        owner_references: Some(vec![owner_reference(agent)]),
        ..Default::default()
    }
}

/// Resolve the agent container image: spec override, then the operator's
/// configured default, then the compiled-in fallback (already folded into
/// the config default).
pub fn resolve_image(agent: &Agent, config: &OperatorConfig) -> String {
    agent
        .spec
        .image
        .clone()
        .filter(|image| !image.is_empty())
        .unwrap_or_else(|| config.default_image.clone())
}

fn quantity_map(spec: &crate::crd::ResourceSpec) -> BTreeMap<String, Quantity> {
    let mut map = BTreeMap::new();
    if let Some(cpu) = &spec.cpu {
        map.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &spec.memory {
        map.insert("memory".to_string(), Quantity(memory.clone()));
    }
    map
}

fn container_resources(resources: Option<&AgentResources>) -> ResourceRequirements {
    let defaults = admission::default_resources();
    let resources = resources.unwrap_or(&defaults);

    ResourceRequirements {
        requests: resources.requests.as_ref().map(quantity_map),
        limits: resources.limits.as_ref().map(quantity_map),
        ..Default::default()
    }
}

fn agent_env(agent: &Agent) -> Vec<EnvVar> {
    let spec = &agent.spec;

    let mut env = vec![
        EnvVar {
            name: "AGENT_PROVIDER".to_string(),
            value: Some(spec.provider.to_string()),
            ..Default::default()
        },
        EnvVar {
            name: "AGENT_MODEL".to_string(),
            value: Some(spec.model.clone()),
            ..Default::default()
        },
        EnvVar {
            name: "AGENT_SYSTEM_PROMPT".to_string(),
            value: Some(spec.system_prompt.clone()),
            ..Default::default()
        },
        EnvVar {
            name: "AGENT_FRAMEWORK".to_string(),
            value: Some(spec.framework().to_string()),
            ..Default::default()
        },
        // The credential is sourced through the secret-key indirection; the
        // value never appears in the Deployment spec.
        EnvVar {
            name: "AGENT_API_KEY".to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: spec.api_secret_ref.name.clone(),
                    key: spec.api_secret_ref.key.clone(),
                    optional: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];

    if let Some(endpoint) = &spec.endpoint {
        env.push(EnvVar {
            name: "AGENT_ENDPOINT".to_string(),
            value: Some(endpoint.clone()),
            ..Default::default()
        });
    }

    if !spec.tools.is_empty() {
        env.push(EnvVar {
            name: "AGENT_TOOLS_COUNT".to_string(),
            value: Some(spec.tools.len().to_string()),
            ..Default::default()
        });
    }

    if let Some(config) = &spec.langgraph_config {
        env.push(EnvVar {
            name: "AGENT_LANGGRAPH_CONFIG".to_string(),
            value: Some(config.to_string()),
            ..Default::default()
        });
    }

    env
}

fn liveness_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/health".to_string()),
            port: IntOrString::Int(AGENT_PORT),
            ..Default::default()
        }),
        initial_delay_seconds: Some(30),
        period_seconds: Some(10),
        ..Default::default()
    }
}

fn readiness_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some("/ready".to_string()),
            port: IntOrString::Int(AGENT_PORT),
            ..Default::default()
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(5),
        ..Default::default()
    }
}

/// Build the Deployment running the agent pods.
pub fn build_deployment(agent: &Agent, namespace: &str, config: &OperatorConfig) -> Deployment {
    let name = agent.name_any();

    let container = Container {
        name: "agent".to_string(),
        image: Some(resolve_image(agent, config)),
        ports: Some(vec![ContainerPort {
            container_port: AGENT_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: Some(agent_env(agent)),
        resources: Some(container_resources(agent.spec.resources.as_ref())),
        liveness_probe: Some(liveness_probe()),
        readiness_probe: Some(readiness_probe()),
        ..Default::default()
    };

    Deployment {
        metadata: metadata(agent, deployment_name(&name), namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(agent.spec.replica_count()),
            selector: LabelSelector {
                match_labels: Some(selector_labels(agent)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(agent)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the Service exposing the agent pods.
pub fn build_service(agent: &Agent, namespace: &str) -> Service {
    let name = agent.name_any();

    Service {
        metadata: metadata(agent, service_name(&name), namespace),
        spec: Some(ServiceSpec {
            type_: Some(agent.spec.service_kind().to_string()),
            selector: Some(selector_labels(agent)),
            ports: Some(vec![ServicePort {
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(AGENT_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the ConfigMap carrying the tool and workflow payloads.
///
/// Payloads are serialized once, in canonical JSON (object keys ordered),
/// so byte-equal specs yield byte-equal ConfigMap data and updates diff to
/// a no-op. Keys are omitted when the corresponding section is empty.
pub fn build_configmap(agent: &Agent, namespace: &str) -> OperatorResult<ConfigMap> {
    let name = agent.name_any();
    let mut data = BTreeMap::new();

    if !agent.spec.tools.is_empty() {
        data.insert(
            "tools.json".to_string(),
            serde_json::to_string(&agent.spec.tools)?,
        );
    }

    if let Some(config) = &agent.spec.langgraph_config {
        data.insert(
            "langgraph-config.json".to_string(),
            serde_json::to_string(config)?,
        );
    }

    Ok(ConfigMap {
        metadata: metadata(agent, configmap_name(&name), namespace),
        data: Some(data),
        ..Default::default()
    })
}

/// Build the HorizontalPodAutoscaler targeting the agent Deployment.
///
/// The declared replica count becomes the floor; the ceiling is a fixed
/// multiple of it. Scaling reacts to CPU (70%) and memory (80%)
/// utilization.
pub fn build_hpa(agent: &Agent, namespace: &str) -> HorizontalPodAutoscaler {
    let name = agent.name_any();
    let min_replicas = agent.spec.replica_count();
    let max_replicas = min_replicas * HPA_MAX_FACTOR;

    let utilization_metric = |resource: &str, target: i32| MetricSpec {
        type_: "Resource".to_string(),
        resource: Some(ResourceMetricSource {
            name: resource.to_string(),
            target: MetricTarget {
                type_: "Utilization".to_string(),
                average_utilization: Some(target),
                ..Default::default()
            },
        }),
        ..Default::default()
    };

    HorizontalPodAutoscaler {
        metadata: metadata(agent, hpa_name(&name), namespace),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: deployment_name(&name),
            },
            min_replicas: Some(min_replicas),
            max_replicas,
            metrics: Some(vec![
                utilization_metric("cpu", 70),
                utilization_metric("memory", 80),
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the Ingress routing external traffic to the agent Service.
pub fn build_ingress(agent: &Agent, namespace: &str) -> Ingress {
    let name = agent.name_any();
    let host = format!("{name}.{namespace}.local");

    let mut meta = metadata(agent, ingress_name(&name), namespace);
    meta.annotations = Some(BTreeMap::from([
        (
            "nginx.ingress.kubernetes.io/rewrite-target".to_string(),
            "/".to_string(),
        ),
        (
            "nginx.ingress.kubernetes.io/ssl-redirect".to_string(),
            "false".to_string(),
        ),
    ]));

    Ingress {
        metadata: meta,
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name(&name),
                                port: Some(ServiceBackendPort {
                                    number: Some(SERVICE_PORT),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        AgentProvider, AgentSpec, ResourceSpec, SecretKeyRef, ServiceKind, ToolSpec,
    };

    fn test_agent(name: &str) -> Agent {
        let mut agent = Agent::new(
            name,
            AgentSpec {
                provider: AgentProvider::Openai,
                model: "gpt-4".to_string(),
                system_prompt: "hi".to_string(),
                api_secret_ref: SecretKeyRef {
                    name: "openai-creds".to_string(),
                    key: "api-key".to_string(),
                },
                endpoint: None,
                framework: None,
                langgraph_config: None,
                tools: vec![],
                replicas: Some(1),
                resources: None,
                service_type: Some(ServiceKind::ClusterIP),
                image: None,
            },
        );
        agent.metadata.namespace = Some("default".to_string());
        agent.metadata.uid = Some("uid-1234".to_string());
        agent
    }

    fn env_value<'a>(env: &'a [EnvVar], name: &str) -> Option<&'a EnvVar> {
        env.iter().find(|e| e.name == name)
    }

    #[test]
    fn child_names_are_stable_functions_of_the_agent_name() {
        assert_eq!(deployment_name("test-agent"), "test-agent");
        assert_eq!(service_name("test-agent"), "test-agent-service");
        assert_eq!(configmap_name("test-agent"), "test-agent-config");
        assert_eq!(hpa_name("test-agent"), "test-agent-hpa");
        assert_eq!(ingress_name("test-agent"), "test-agent-ingress");
    }

    #[test]
    fn builders_are_deterministic() {
        let agent = test_agent("test-agent");
        let config = OperatorConfig::default();

        assert_eq!(
            serde_json::to_value(build_deployment(&agent, "default", &config)).unwrap(),
            serde_json::to_value(build_deployment(&agent, "default", &config)).unwrap()
        );
        assert_eq!(
            serde_json::to_value(build_service(&agent, "default")).unwrap(),
            serde_json::to_value(build_service(&agent, "default")).unwrap()
        );
        assert_eq!(
            serde_json::to_value(build_configmap(&agent, "default").unwrap()).unwrap(),
            serde_json::to_value(build_configmap(&agent, "default").unwrap()).unwrap()
        );
    }

    #[test]
    fn every_child_carries_exactly_one_owner_reference() {
        let agent = test_agent("test-agent");
        let config = OperatorConfig::default();

        let metas = [
            build_deployment(&agent, "default", &config).metadata,
            build_service(&agent, "default").metadata,
            build_configmap(&agent, "default").unwrap().metadata,
            build_hpa(&agent, "default").metadata,
            build_ingress(&agent, "default").metadata,
        ];

        for meta in metas {
            let refs = meta.owner_references.expect("owner references missing");
            assert_eq!(refs.len(), 1);
            let owner = &refs[0];
            assert_eq!(owner.api_version, "agentic.ai/v1");
            assert_eq!(owner.kind, "Agent");
            assert_eq!(owner.name, "test-agent");
            assert_eq!(owner.uid, "uid-1234");
            assert_eq!(owner.controller, Some(true));
        }
    }

    #[test]
    fn deployment_env_contract() {
        let mut agent = test_agent("test-agent");
        agent.spec.endpoint = Some("http://vllm.inference.svc:8000".to_string());
        agent.spec.tools = vec![ToolSpec {
            name: "search".to_string(),
            description: "Web search".to_string(),
            input_schema: None,
        }];
        agent.spec.langgraph_config = Some(serde_json::json!({"entrypoint": "start"}));

        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let env = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();

        assert_eq!(
            env_value(&env, "AGENT_PROVIDER").unwrap().value.as_deref(),
            Some("openai")
        );
        assert_eq!(
            env_value(&env, "AGENT_MODEL").unwrap().value.as_deref(),
            Some("gpt-4")
        );
        assert_eq!(
            env_value(&env, "AGENT_FRAMEWORK").unwrap().value.as_deref(),
            Some("direct")
        );
        assert_eq!(
            env_value(&env, "AGENT_ENDPOINT").unwrap().value.as_deref(),
            Some("http://vllm.inference.svc:8000")
        );
        assert_eq!(
            env_value(&env, "AGENT_TOOLS_COUNT")
                .unwrap()
                .value
                .as_deref(),
            Some("1")
        );
        assert!(env_value(&env, "AGENT_LANGGRAPH_CONFIG").is_some());

        // The credential is an indirection, never an inline value.
        let api_key = env_value(&env, "AGENT_API_KEY").unwrap();
        assert!(api_key.value.is_none());
        let secret_ref = api_key
            .value_from
            .as_ref()
            .unwrap()
            .secret_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(secret_ref.name, "openai-creds");
        assert_eq!(secret_ref.key, "api-key");
    }

    #[test]
    fn deployment_omits_optional_env_when_unset() {
        let agent = test_agent("test-agent");
        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let env = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();

        assert!(env_value(&env, "AGENT_ENDPOINT").is_none());
        assert!(env_value(&env, "AGENT_TOOLS_COUNT").is_none());
        assert!(env_value(&env, "AGENT_LANGGRAPH_CONFIG").is_none());
    }

    #[test]
    fn deployment_probes_match_agent_contract() {
        let agent = test_agent("test-agent");
        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let container = deployment.spec.unwrap().template.spec.unwrap().containers[0].clone();

        let liveness = container.liveness_probe.unwrap();
        let get = liveness.http_get.unwrap();
        assert_eq!(get.path.as_deref(), Some("/health"));
        assert_eq!(get.port, IntOrString::Int(8080));
        assert_eq!(liveness.initial_delay_seconds, Some(30));
        assert_eq!(liveness.period_seconds, Some(10));

        let readiness = container.readiness_probe.unwrap();
        let get = readiness.http_get.unwrap();
        assert_eq!(get.path.as_deref(), Some("/ready"));
        assert_eq!(readiness.initial_delay_seconds, Some(5));
        assert_eq!(readiness.period_seconds, Some(5));
    }

    #[test]
    fn deployment_selector_uses_instance_label() {
        let agent = test_agent("test-agent");
        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let selector = deployment.spec.unwrap().selector.match_labels.unwrap();

        assert_eq!(selector.len(), 1);
        assert_eq!(
            selector.get("app.kubernetes.io/instance").map(String::as_str),
            Some("test-agent")
        );
    }

    #[test]
    fn image_resolution_order() {
        let mut agent = test_agent("test-agent");
        let mut config = OperatorConfig::default();

        // Compiled-in fallback via the default config.
        assert_eq!(
            resolve_image(&agent, &config),
            crate::config::FALLBACK_AGENT_IMAGE
        );

        // Operator-level default wins over the fallback.
        config.default_image = "registry.local/agent:stable".to_string();
        assert_eq!(resolve_image(&agent, &config), "registry.local/agent:stable");

        // Spec image wins over everything.
        agent.spec.image = Some("registry.local/custom:v7".to_string());
        assert_eq!(resolve_image(&agent, &config), "registry.local/custom:v7");
    }

    #[test]
    fn deployment_applies_default_resources_when_unset() {
        let agent = test_agent("test-agent");
        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let resources = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();

        let requests = resources.requests.unwrap();
        assert_eq!(requests.get("cpu"), Some(&Quantity("100m".to_string())));
        assert_eq!(requests.get("memory"), Some(&Quantity("256Mi".to_string())));
        let limits = resources.limits.unwrap();
        assert_eq!(limits.get("cpu"), Some(&Quantity("200m".to_string())));
        assert_eq!(limits.get("memory"), Some(&Quantity("512Mi".to_string())));
    }

    #[test]
    fn deployment_honors_declared_resources() {
        let mut agent = test_agent("test-agent");
        agent.spec.resources = Some(AgentResources {
            requests: Some(ResourceSpec {
                cpu: Some("500m".to_string()),
                memory: Some("1Gi".to_string()),
            }),
            limits: None,
        });

        let deployment = build_deployment(&agent, "default", &OperatorConfig::default());
        let resources = deployment.spec.unwrap().template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();

        let requests = resources.requests.unwrap();
        assert_eq!(requests.get("cpu"), Some(&Quantity("500m".to_string())));
        assert!(resources.limits.is_none());
    }

    #[test]
    fn service_ports_and_type() {
        let mut agent = test_agent("test-agent");
        agent.spec.service_type = Some(ServiceKind::LoadBalancer);

        let service = build_service(&agent, "default");
        let spec = service.spec.unwrap();

        assert_eq!(spec.type_.as_deref(), Some("LoadBalancer"));
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(8080)));
        assert_eq!(
            spec.selector
                .unwrap()
                .get("app.kubernetes.io/instance")
                .map(String::as_str),
            Some("test-agent")
        );
    }

    #[test]
    fn configmap_omits_empty_sections() {
        let agent = test_agent("test-agent");
        let cm = build_configmap(&agent, "default").unwrap();
        assert!(cm.data.unwrap().is_empty());
    }

    #[test]
    fn configmap_payloads_are_canonical() {
        let mut agent = test_agent("test-agent");
        agent.spec.tools = vec![ToolSpec {
            name: "search".to_string(),
            description: "Web search".to_string(),
            input_schema: Some(serde_json::json!({"type": "object"})),
        }];
        agent.spec.langgraph_config =
            Some(serde_json::json!({"nodes": [], "entrypoint": "start"}));

        let first = build_configmap(&agent, "default").unwrap().data.unwrap();
        let second = build_configmap(&agent, "default").unwrap().data.unwrap();
        assert_eq!(first, second);

        assert!(first.contains_key("tools.json"));
        // serde_json orders object keys, so the payload is canonical.
        assert_eq!(
            first.get("langgraph-config.json").map(String::as_str),
            Some(r#"{"entrypoint":"start","nodes":[]}"#)
        );
    }

    #[test]
    fn hpa_scales_between_declared_and_three_times_replicas() {
        let mut agent = test_agent("test-agent");
        agent.spec.replicas = Some(2);

        let hpa = build_hpa(&agent, "default");
        let spec = hpa.spec.unwrap();

        assert_eq!(spec.min_replicas, Some(2));
        assert_eq!(spec.max_replicas, 6);
        assert_eq!(spec.scale_target_ref.kind, "Deployment");
        assert_eq!(spec.scale_target_ref.name, "test-agent");

        let metrics = spec.metrics.unwrap();
        let cpu = metrics[0].resource.as_ref().unwrap();
        assert_eq!(cpu.name, "cpu");
        assert_eq!(cpu.target.average_utilization, Some(70));
        let memory = metrics[1].resource.as_ref().unwrap();
        assert_eq!(memory.name, "memory");
        assert_eq!(memory.target.average_utilization, Some(80));
    }

    #[test]
    fn ingress_routes_host_to_service() {
        let agent = test_agent("test-agent");
        let ingress = build_ingress(&agent, "default");

        let annotations = ingress.metadata.annotations.clone().unwrap();
        assert_eq!(
            annotations
                .get("nginx.ingress.kubernetes.io/rewrite-target")
                .map(String::as_str),
            Some("/")
        );
        assert_eq!(
            annotations
                .get("nginx.ingress.kubernetes.io/ssl-redirect")
                .map(String::as_str),
            Some("false")
        );

        let rules = ingress.spec.unwrap().rules.unwrap();
        assert_eq!(rules[0].host.as_deref(), Some("test-agent.default.local"));

        let path = &rules[0].http.as_ref().unwrap().paths[0];
        assert_eq!(path.path_type, "Prefix");
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "test-agent-service");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }
}
