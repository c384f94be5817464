//! Agentic Kubernetes Operator binary.
//!
//! Runs the Agent controller: watches Agent resources and every owned
//! child kind, holds the leader lease when replicated, and serves the
//! operator's own health endpoints.

use std::sync::Arc;

use agentic_operator::config::OperatorConfig;
use agentic_operator::controller::{error_policy, AgentController, ControllerContext, ReconcileAction};
use agentic_operator::crd::Agent;
use agentic_operator::health::{run_health_server, HealthState};
use agentic_operator::leader::{LeaderElection, LeaderElectionConfig};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agentic_operator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    tracing::info!("Starting Agentic Kubernetes Operator");

    // CRD generation mode for chart packaging and local installs.
    if std::env::args().any(|arg| arg == "--generate-crds") {
        generate_crds()?;
        return Ok(());
    }

    let client = Client::try_default().await?;
    tracing::info!("Connected to Kubernetes cluster");

    let config = OperatorConfig::from_env();
    tracing::info!(
        default_image = %config.default_image,
        health_port = config.health_port,
        "Loaded operator configuration"
    );

    // Only the lease holder reconciles. Standbys block here until the
    // current leader dies or relinquishes.
    let leader_config = LeaderElectionConfig::from_env()?;
    if leader_config.enabled() {
        let election = LeaderElection::new(client.clone(), &leader_config);
        election.acquire().await?;

        let renewal = LeaderElection::new(client.clone(), &leader_config);
        renewal.spawn_renewal_task();
    } else {
        tracing::info!("Leader election disabled, assuming single replica");
    }

    let health_state = Arc::new(HealthState::new());
    let health_port = config.health_port;
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move { run_health_server(health_state, health_port).await })
    };

    let ctx = Arc::new(ControllerContext::new(client.clone(), config));

    tokio::select! {
        () = run_agent_controller(client, ctx) => {
            tracing::info!("Agent controller stream ended, shutting down");
        }
        result = health_handle => {
            anyhow::bail!("Health server exited unexpectedly: {result:?}");
        }
    }

    Ok(())
}

/// Run the Agent controller until shutdown.
///
/// Watches Agent plus every owned child kind; child events map back to the
/// owning Agent's key through the owner reference.
async fn run_agent_controller(client: Client, ctx: Arc<ControllerContext>) {
    tracing::info!("Starting Agent controller");

    let agents: Api<Agent> = Api::all(client.clone());
    let deployments: Api<Deployment> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client.clone());
    let configmaps: Api<ConfigMap> = Api::all(client.clone());
    let hpas: Api<HorizontalPodAutoscaler> = Api::all(client.clone());
    let ingresses: Api<Ingress> = Api::all(client.clone());

    let controller = AgentController::new(ctx.clone());

    Controller::new(agents, WatcherConfig::default())
        .owns(deployments, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .owns(configmaps, WatcherConfig::default())
        .owns(hpas, WatcherConfig::default())
        .owns(ingresses, WatcherConfig::default())
        .shutdown_on_signal()
        .run(
            move |agent, _ctx| {
                let controller = controller.clone();
                async move {
                    controller.reconcile(agent).await.map(|action| match action {
                        ReconcileAction::Requeue(duration) => Action::requeue(duration),
                        ReconcileAction::Done => Action::await_change(),
                    })
                }
            },
            error_policy,
            ctx,
        )
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(agent = %obj.name, ?action, "Reconciled Agent");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Agent controller stream error");
                }
            }
        })
        .await;
}

/// Print the Agent CRD as YAML.
fn generate_crds() -> anyhow::Result<()> {
    println!("---");
    println!("{}", serde_yaml::to_string(&Agent::crd())?);
    Ok(())
}
