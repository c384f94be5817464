//! Agent controller.
//!
//! Reconciles Agent resources into their owned children: a ConfigMap, a
//! Deployment, a Service and, conditionally, a HorizontalPodAutoscaler and
//! an Ingress. Each pass is level-driven: it reads the latest desired and
//! observed state and computes the diff fresh, so retries and concurrent
//! edits converge without event ordering assumptions.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};

use super::retry::{compute_backoff, ErrorKind};
use super::{ControllerContext, ReconcileAction};
use crate::admission;
use crate::crd::{Agent, AgentStatus, ServiceKind, FINALIZER};
use crate::error::{OperatorError, OperatorResult};
use crate::resources;
use crate::status;

/// Field manager identity used for server-side apply.
const FIELD_MANAGER: &str = "agentic-operator";

/// Controller for Agent resources.
#[derive(Clone)]
pub struct AgentController {
    ctx: Arc<ControllerContext>,
}

impl AgentController {
    /// Create a new agent controller.
    pub fn new(ctx: Arc<ControllerContext>) -> Self {
        Self { ctx }
    }

    /// Reconcile a single Agent.
    ///
    /// Pass ordering:
    /// 1. Finalizer: added with an atomic update before anything else.
    /// 2. Deletion branch: teardown, then finalizer removal.
    /// 3. Status seed for freshly created Agents.
    /// 4. Spec re-validation and credential check; failures here are
    ///    terminal and surface through the status, not the work queue.
    /// 5. Child reconciliation in dependency order, then conditional
    ///    deletion of the HPA and Ingress.
    /// 6. Status refresh from the observed Deployment.
    pub async fn reconcile(&self, agent: Arc<Agent>) -> OperatorResult<ReconcileAction> {
        let name = agent.name_any();
        let namespace = agent
            .namespace()
            .ok_or_else(|| OperatorError::InvalidConfig("Agent must be namespaced".into()))?;

        tracing::info!(
            name = %name,
            namespace = %namespace,
            provider = %agent.spec.provider,
            "Reconciling Agent"
        );

        let agents: Api<Agent> = Api::namespaced(self.ctx.client.clone(), &namespace);

        // Finalizer first: the resource must never reach Running without
        // one, and deletion must not proceed while children may exist.
        if agent.metadata.deletion_timestamp.is_none() && !has_finalizer(&agent) {
            self.add_finalizer(&agents, &agent).await?;
            // The update fires a new event; the next pass continues.
            return Ok(ReconcileAction::Done);
        }

        if agent.metadata.deletion_timestamp.is_some() {
            if has_finalizer(&agent) {
                self.teardown(&agents, &agent).await?;
                self.remove_finalizer(&agents, &agent).await?;
                tracing::info!(name = %name, "Released finalizer, garbage collection takes over");
            }
            return Ok(ReconcileAction::Done);
        }

        if agent.status.is_none() {
            self.seed_status(&agents, &name).await?;
            return Ok(ReconcileAction::requeue_short());
        }

        // Defense in depth: admission may be disabled or bypassed, so the
        // spec is re-validated on every pass. Failure is terminal, so it
        // is surfaced through the status instead of the work queue.
        if let Err(err) = admission::validate(&agent.spec) {
            tracing::warn!(name = %name, error = %err, "Spec validation failed");
            self.mark_failed(&agents, &agent, "InvalidSpec", &err.to_string())
                .await?;
            return Ok(ReconcileAction::requeue_grace());
        }

        match self.check_credentials(&agent, &namespace).await {
            Ok(()) => {}
            Err(err) if err.is_terminal() => {
                tracing::warn!(name = %name, error = %err, "Credential check failed");
                self.mark_failed(
                    &agents,
                    &agent,
                    "MissingCredentials",
                    &format!("Secret validation failed: {err}"),
                )
                .await?;
                return Ok(ReconcileAction::requeue_grace());
            }
            Err(err) => return Err(err),
        }

        // Children in dependency order. Transient API errors propagate to
        // the queue for backoff.
        self.ensure_configmap(&agent, &namespace).await?;
        self.ensure_deployment(&agent, &namespace).await?;
        self.ensure_service(&agent, &namespace).await?;

        if agent.spec.replica_count() > 1 {
            self.ensure_hpa(&agent, &namespace).await?;
        } else {
            self.delete_hpa(&agent, &namespace).await?;
        }

        if agent.spec.service_kind() == ServiceKind::LoadBalancer {
            self.ensure_ingress(&agent, &namespace).await?;
        } else {
            self.delete_ingress(&agent, &namespace).await?;
        }

        self.refresh_status(&agents, &agent, &namespace).await?;

        if let Some(uid) = agent.metadata.uid.as_deref() {
            self.ctx.retry_tracker.reset(uid);
        }

        tracing::debug!(name = %name, "Reconciliation completed");
        Ok(ReconcileAction::requeue_long())
    }

    /// Add the controller finalizer with an atomic full-object update so a
    /// concurrent write surfaces as a retriable conflict.
    async fn add_finalizer(&self, api: &Api<Agent>, agent: &Agent) -> OperatorResult<()> {
        let name = agent.name_any();
        tracing::info!(name = %name, "Adding finalizer");

        let mut updated = (*agent).clone();
        updated.metadata.managed_fields = None;
        updated
            .metadata
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER.to_string());

        api.replace(&name, &PostParams::default(), &updated).await?;
        Ok(())
    }

    /// Remove the controller finalizer, allowing the API server to delete
    /// the Agent and cascade to its children via owner references.
    async fn remove_finalizer(&self, api: &Api<Agent>, agent: &Agent) -> OperatorResult<()> {
        let name = agent.name_any();

        let mut updated = (*agent).clone();
        updated.metadata.managed_fields = None;
        if let Some(finalizers) = updated.metadata.finalizers.as_mut() {
            finalizers.retain(|f| f != FINALIZER);
        }

        api.replace(&name, &PostParams::default(), &updated).await?;
        Ok(())
    }

    /// Teardown on deletion. Children are not deleted here; the garbage
    /// collector removes them through owner references once the Agent is
    /// gone. Kept fast so user deletes are not held up.
    async fn teardown(&self, api: &Api<Agent>, agent: &Agent) -> OperatorResult<()> {
        let name = agent.name_any();
        tracing::info!(name = %name, "Agent is being deleted, running teardown");

        let patch = serde_json::json!({
            "status": {
                "message": "Agent is being deleted",
                "lastUpdated": status::now_rfc3339(),
            }
        });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(())
    }

    /// Initialize the status subresource for a freshly created Agent.
    async fn seed_status(&self, api: &Api<Agent>, name: &str) -> OperatorResult<()> {
        tracing::info!(name = %name, "Initializing Agent status");

        let seed = AgentStatus {
            message: Some("Initializing agent deployment".to_string()),
            last_updated: Some(status::now_rfc3339()),
            ..Default::default()
        };
        self.write_status(api, name, &seed).await
    }

    /// Verify the referenced Secret exists and carries the referenced key.
    async fn check_credentials(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let secret_ref = &agent.spec.api_secret_ref;
        let secrets: Api<Secret> = Api::namespaced(self.ctx.client.clone(), namespace);

        let secret = match secrets.get(&secret_ref.name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(err)) if err.code == 404 => {
                return Err(OperatorError::NotFound {
                    kind: "Secret".into(),
                    name: secret_ref.name.clone(),
                    namespace: namespace.into(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let has_key = secret
            .data
            .as_ref()
            .is_some_and(|data| data.contains_key(&secret_ref.key));

        if has_key {
            Ok(())
        } else {
            Err(OperatorError::MissingSecretKey {
                secret: secret_ref.name.clone(),
                key: secret_ref.key.clone(),
            })
        }
    }

    /// Ensure the ConfigMap exists and matches the desired payloads.
    async fn ensure_configmap(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let desired = resources::build_configmap(agent, namespace)?;
        let name = desired.metadata.name.clone().unwrap_or_default();
        let configmaps: Api<ConfigMap> = Api::namespaced(self.ctx.client.clone(), namespace);

        match configmaps.get(&name).await {
            Ok(_existing) => {
                tracing::debug!(name = %name, "Updating existing ConfigMap");
                configmaps
                    .patch(
                        &name,
                        &PatchParams::apply(FIELD_MANAGER).force(),
                        &Patch::Apply(&desired),
                    )
                    .await?;
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                tracing::info!(name = %name, "Creating ConfigMap");
                configmaps.create(&PostParams::default(), &desired).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Ensure the Deployment exists and matches the desired spec.
    async fn ensure_deployment(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let desired = resources::build_deployment(agent, namespace, &self.ctx.config);
        let name = desired.metadata.name.clone().unwrap_or_default();
        let deployments: Api<Deployment> = Api::namespaced(self.ctx.client.clone(), namespace);

        match deployments.get(&name).await {
            Ok(_existing) => {
                tracing::debug!(name = %name, "Updating existing Deployment");
                deployments
                    .patch(
                        &name,
                        &PatchParams::apply(FIELD_MANAGER).force(),
                        &Patch::Apply(&desired),
                    )
                    .await?;
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                tracing::info!(name = %name, "Creating Deployment");
                deployments.create(&PostParams::default(), &desired).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Ensure the Service exists and matches the desired spec, including
    /// changes to the service type.
    async fn ensure_service(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let desired = resources::build_service(agent, namespace);
        let name = desired.metadata.name.clone().unwrap_or_default();
        let services: Api<Service> = Api::namespaced(self.ctx.client.clone(), namespace);

        match services.get(&name).await {
            Ok(_existing) => {
                tracing::debug!(name = %name, "Updating existing Service");
                services
                    .patch(
                        &name,
                        &PatchParams::apply(FIELD_MANAGER).force(),
                        &Patch::Apply(&desired),
                    )
                    .await?;
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                tracing::info!(name = %name, "Creating Service");
                services.create(&PostParams::default(), &desired).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Ensure the HPA exists for multi-replica agents.
    async fn ensure_hpa(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let desired = resources::build_hpa(agent, namespace);
        let name = desired.metadata.name.clone().unwrap_or_default();
        let hpas: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.ctx.client.clone(), namespace);

        match hpas.get(&name).await {
            Ok(_existing) => {
                tracing::debug!(name = %name, "Updating existing HPA");
                hpas.patch(
                    &name,
                    &PatchParams::apply(FIELD_MANAGER).force(),
                    &Patch::Apply(&desired),
                )
                .await?;
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                tracing::info!(name = %name, "Creating HPA");
                hpas.create(&PostParams::default(), &desired).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Delete the HPA left over from a previous multi-replica spec.
    /// Not-found is success.
    async fn delete_hpa(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let name = resources::hpa_name(&agent.name_any());
        let hpas: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.ctx.client.clone(), namespace);

        match hpas.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {
                tracing::info!(name = %name, "Deleted HPA for single-replica agent");
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ensure the Ingress exists for LoadBalancer-exposed agents.
    async fn ensure_ingress(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let desired = resources::build_ingress(agent, namespace);
        let name = desired.metadata.name.clone().unwrap_or_default();
        let ingresses: Api<Ingress> = Api::namespaced(self.ctx.client.clone(), namespace);

        match ingresses.get(&name).await {
            Ok(_existing) => {
                tracing::debug!(name = %name, "Updating existing Ingress");
                ingresses
                    .patch(
                        &name,
                        &PatchParams::apply(FIELD_MANAGER).force(),
                        &Patch::Apply(&desired),
                    )
                    .await?;
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                tracing::info!(name = %name, "Creating Ingress");
                ingresses.create(&PostParams::default(), &desired).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Delete the Ingress left over from a previous LoadBalancer spec.
    /// Not-found is success.
    async fn delete_ingress(&self, agent: &Agent, namespace: &str) -> OperatorResult<()> {
        let name = resources::ingress_name(&agent.name_any());
        let ingresses: Api<Ingress> = Api::namespaced(self.ctx.client.clone(), namespace);

        match ingresses.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {
                tracing::info!(name = %name, "Deleted Ingress for non-LoadBalancer service");
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Derive and write the status from the observed Deployment.
    async fn refresh_status(
        &self,
        api: &Api<Agent>,
        agent: &Agent,
        namespace: &str,
    ) -> OperatorResult<()> {
        let deployments: Api<Deployment> = Api::namespaced(self.ctx.client.clone(), namespace);

        let deployment = match deployments
            .get(&resources::deployment_name(&agent.name_any()))
            .await
        {
            Ok(deployment) => Some(deployment),
            Err(kube::Error::Api(err)) if err.code == 404 => None,
            Err(e) => return Err(e.into()),
        };

        let derived = status::derive_status(agent, deployment.as_ref());
        self.write_status(api, &agent.name_any(), &derived).await
    }

    /// Transition the Agent to Failed with a Degraded condition.
    async fn mark_failed(
        &self,
        api: &Api<Agent>,
        agent: &Agent,
        reason: &str,
        message: &str,
    ) -> OperatorResult<()> {
        let failed = status::failed_status(agent, reason, message);
        self.write_status(api, &agent.name_any(), &failed).await
    }

    async fn write_status(
        &self,
        api: &Api<Agent>,
        name: &str,
        status: &AgentStatus,
    ) -> OperatorResult<()> {
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

fn has_finalizer(agent: &Agent) -> bool {
    agent.finalizers().iter().any(|f| f == FINALIZER)
}

fn classify_error(error: &OperatorError) -> ErrorKind {
    if error.is_terminal() {
        ErrorKind::Permanent
    } else {
        ErrorKind::Transient
    }
}

/// Handle errors during reconciliation with per-resource backoff.
pub fn error_policy(agent: Arc<Agent>, error: &OperatorError, ctx: Arc<ControllerContext>) -> Action {
    let uid = agent.metadata.uid.as_deref().unwrap_or("unknown");
    let kind = classify_error(error);
    let attempt = ctx.retry_tracker.increment(uid);

    tracing::warn!(
        name = %agent.name_any(),
        error = %error,
        attempt,
        error_kind = ?kind,
        "Agent reconciliation failed"
    );

    compute_backoff(attempt, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AgentProvider, AgentSpec, SecretKeyRef};

    fn test_agent() -> Agent {
        Agent::new(
            "test-agent",
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
                replicas: Some(1),
                resources: None,
                service_type: None,
                image: None,
            },
        )
    }

    #[test]
    fn finalizer_detection() {
        let mut agent = test_agent();
        assert!(!has_finalizer(&agent));

        agent.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
        assert!(has_finalizer(&agent));

        agent.metadata.finalizers = Some(vec!["other.io/finalizer".to_string()]);
        assert!(!has_finalizer(&agent));
    }

    #[test]
    fn terminal_errors_are_permanent() {
        assert_eq!(
            classify_error(&OperatorError::InvalidSpec("bad".into())),
            ErrorKind::Permanent
        );
        assert_eq!(
            classify_error(&OperatorError::MissingSecretKey {
                secret: "s".into(),
                key: "k".into()
            }),
            ErrorKind::Permanent
        );
        assert_eq!(
            classify_error(&OperatorError::SerializationError("oops".into())),
            ErrorKind::Transient
        );
    }
}
