//! Reconciliation logic for the Agent custom resource.
//!
//! # Usage with kube-runtime
//!
//! The controller runtime requires both a reconcile function and an error
//! policy:
//!
//! ```ignore
//! use agentic_operator::controller::{AgentController, error_policy};
//!
//! Controller::new(agents, watcher_config)
//!     .run(|agent, ctx| async move {
//!         let controller = AgentController::new(ctx.clone());
//!         controller.reconcile(agent).await
//!     }, error_policy, context)
//!     .for_each(|_| futures::future::ready(()))
//!     .await;
//! ```

mod agent;
pub mod retry;

pub use agent::{error_policy, AgentController};

use std::sync::Arc;

use crate::config::OperatorConfig;
use retry::RetryTracker;

/// Shared context for the controller.
pub struct ControllerContext {
    /// Kubernetes client.
    pub client: kube::Client,
    /// Operator-level configuration.
    pub config: OperatorConfig,
    /// Retry bookkeeping for the error policy.
    pub retry_tracker: Arc<RetryTracker>,
}

impl ControllerContext {
    /// Create a new controller context.
    pub fn new(client: kube::Client, config: OperatorConfig) -> Self {
        Self {
            client,
            config,
            retry_tracker: Arc::new(RetryTracker::new()),
        }
    }
}

/// Result type for reconciliation actions.
#[derive(Debug)]
pub enum ReconcileAction {
    /// Requeue after the specified duration.
    Requeue(std::time::Duration),
    /// Don't requeue (reconciliation complete; the next event re-enters).
    Done,
}

impl ReconcileAction {
    /// Requeue after 5 seconds (waiting on a status write to propagate).
    pub fn requeue_short() -> Self {
        Self::Requeue(std::time::Duration::from_secs(5))
    }

    /// Requeue after 2 minutes (grace interval for terminal failures).
    pub fn requeue_grace() -> Self {
        Self::Requeue(std::time::Duration::from_secs(120))
    }

    /// Requeue after 5 minutes (periodic resync to notice status drift).
    pub fn requeue_long() -> Self {
        Self::Requeue(std::time::Duration::from_secs(300))
    }
}
