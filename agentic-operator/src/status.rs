//! Status derivation for Agent resources.
//!
//! Pure functions from observed state to the status subresource. The
//! reconciler owns the writes; everything here is side-effect free so the
//! phase logic can be tested without a cluster.

use k8s_openapi::api::apps::v1::Deployment;

use crate::crd::{
    Agent, AgentCondition, AgentConditionType, AgentPhase, AgentStatus, ConditionStatus,
    ReplicaStatus,
};

/// Current time in the RFC 3339 form used throughout the status fields.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Insert or replace a condition by type.
///
/// `lastTransitionTime` only moves when the condition's status actually
/// changes; re-asserting the same status keeps the original transition
/// timestamp.
pub fn upsert_condition(conditions: &mut Vec<AgentCondition>, mut new: AgentCondition) {
    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.condition_type == new.condition_type)
    {
        if existing.status == new.status {
            new.last_transition_time = existing.last_transition_time.clone();
        }
        *existing = new;
    } else {
        conditions.push(new);
    }
}

fn ready_condition(running: bool, now: &str) -> AgentCondition {
    if running {
        AgentCondition {
            condition_type: AgentConditionType::Ready,
            status: ConditionStatus::True,
            reason: Some("DeploymentReady".to_string()),
            message: Some("All replicas are ready".to_string()),
            last_transition_time: Some(now.to_string()),
        }
    } else {
        AgentCondition {
            condition_type: AgentConditionType::Ready,
            status: ConditionStatus::False,
            reason: Some("DeploymentNotReady".to_string()),
            message: Some("Deployment is not yet ready".to_string()),
            last_transition_time: Some(now.to_string()),
        }
    }
}

/// Derive the Agent's status from the observed Deployment.
///
/// `Failed` is never produced here; only the reconciler's error branches
/// write it (via [`failed_status`]).
pub fn derive_status(agent: &Agent, deployment: Option<&Deployment>) -> AgentStatus {
    let now = now_rfc3339();
    let mut status = agent.status.clone().unwrap_or_default();

    let (replica_status, phase, message) = match deployment {
        Some(deployment) => {
            let desired = deployment
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or_else(|| agent.spec.replica_count());
            let observed = deployment.status.clone().unwrap_or_default();
            let ready = observed.ready_replicas.unwrap_or(0);
            let available = observed.available_replicas.unwrap_or(0);
            let total = observed.replicas.unwrap_or(0);

            let replica_status = ReplicaStatus {
                desired,
                ready,
                available,
            };

            if ready == desired && desired > 0 {
                (
                    replica_status,
                    AgentPhase::Running,
                    "Agent is running and ready".to_string(),
                )
            } else if total == 0 {
                (
                    replica_status,
                    AgentPhase::Pending,
                    "Agent deployment is scaling up".to_string(),
                )
            } else {
                (
                    replica_status,
                    AgentPhase::Pending,
                    format!("Agent deployment in progress ({ready}/{desired} ready)"),
                )
            }
        }
        None => (
            ReplicaStatus {
                desired: agent.spec.replica_count(),
                ready: 0,
                available: 0,
            },
            AgentPhase::Pending,
            "Waiting for agent deployment to be scheduled".to_string(),
        ),
    };

    status.phase = phase;
    status.message = Some(message);
    status.replica_status = replica_status;
    status.last_updated = Some(now.clone());

    upsert_condition(
        &mut status.conditions,
        ready_condition(phase == AgentPhase::Running, &now),
    );

    // A successful pass clears a previously raised Degraded condition.
    let degraded_raised = status.conditions.iter().any(|c| {
        c.condition_type == AgentConditionType::Degraded && c.status == ConditionStatus::True
    });
    if degraded_raised {
        upsert_condition(
            &mut status.conditions,
            AgentCondition {
                condition_type: AgentConditionType::Degraded,
                status: ConditionStatus::False,
                reason: Some("ReconciliationSucceeded".to_string()),
                message: Some("Agent reconciled successfully".to_string()),
                last_transition_time: Some(now),
            },
        );
    }

    status
}

/// Build the `Failed` status written when a terminal precondition fails.
/// Replica counts and unrelated conditions are preserved.
pub fn failed_status(agent: &Agent, reason: &str, message: &str) -> AgentStatus {
    let now = now_rfc3339();
    let mut status = agent.status.clone().unwrap_or_default();

    status.phase = AgentPhase::Failed;
    status.message = Some(message.to_string());
    status.last_updated = Some(now.clone());

    upsert_condition(
        &mut status.conditions,
        AgentCondition {
            condition_type: AgentConditionType::Degraded,
            status: ConditionStatus::True,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_transition_time: Some(now),
        },
    );

    status
}
