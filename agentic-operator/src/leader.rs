//! Leader election for replicated operator deployments.
//!
//! Exactly one replica reconciles at a time. Standby replicas block in
//! [`LeaderElection::acquire`] until the Lease becomes free; a leader that
//! loses the lease exits so Kubernetes restarts it as a standby.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Consecutive renewal failures tolerated before exiting, so transient API
/// hiccups don't bounce the leader.
const MAX_RENEWAL_FAILURES: u32 = 3;

/// Leader election settings.
///
/// Construct with [`LeaderElectionConfig::from_env`] or
/// [`LeaderElectionConfig::new`]; fields are private so the
/// renew-before-expiry invariant always holds.
#[derive(Debug, Clone)]
pub struct LeaderElectionConfig {
    enabled: bool,
    lease_name: String,
    namespace: String,
    holder_id: String,
    lease_duration: Duration,
    renew_interval: Duration,
}

impl LeaderElectionConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when any identity field is empty or when
    /// `renew_interval >= lease_duration`.
    pub fn new(
        lease_name: String,
        namespace: String,
        holder_id: String,
        lease_duration: Duration,
        renew_interval: Duration,
    ) -> Result<Self> {
        ensure!(!lease_name.is_empty(), "lease_name cannot be empty");
        ensure!(!namespace.is_empty(), "namespace cannot be empty");
        ensure!(!holder_id.is_empty(), "holder_id cannot be empty");
        ensure!(
            renew_interval < lease_duration,
            "renew_interval ({:?}) must be less than lease_duration ({:?})",
            renew_interval,
            lease_duration
        );

        Ok(Self {
            enabled: true,
            lease_name,
            namespace,
            holder_id,
            lease_duration,
            renew_interval,
        })
    }

    /// A configuration with leader election turned off (single replica).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            lease_name: String::new(),
            namespace: String::new(),
            holder_id: String::new(),
            lease_duration: Duration::from_secs(15),
            renew_interval: Duration::from_secs(5),
        }
    }

    /// Load from environment variables.
    ///
    /// - `LEADER_ELECTION_ENABLED`: "true" to enable (default: false)
    /// - `LEADER_ELECTION_LEASE_NAME`: Lease name (required if enabled)
    /// - `POD_NAMESPACE`: namespace for the Lease (required if enabled)
    /// - `POD_NAME`: holder identity (required if enabled)
    /// - `LEADER_ELECTION_LEASE_DURATION`: TTL in seconds (default: 15)
    /// - `LEADER_ELECTION_RENEW_INTERVAL`: renewal in seconds (default: 5)
    pub fn from_env() -> Result<Self> {
        let enabled = std::env::var("LEADER_ELECTION_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        if !enabled {
            return Ok(Self::disabled());
        }

        let lease_name = std::env::var("LEADER_ELECTION_LEASE_NAME")
            .context("LEADER_ELECTION_LEASE_NAME required when leader election is enabled")?;
        let namespace = std::env::var("POD_NAMESPACE")
            .context("POD_NAMESPACE required when leader election is enabled")?;
        let holder_id = std::env::var("POD_NAME")
            .context("POD_NAME required when leader election is enabled")?;

        let lease_duration =
            duration_from_env("LEADER_ELECTION_LEASE_DURATION", Duration::from_secs(15));
        let renew_interval =
            duration_from_env("LEADER_ELECTION_RENEW_INTERVAL", Duration::from_secs(5));

        Self::new(
            lease_name,
            namespace,
            holder_id,
            lease_duration,
            renew_interval,
        )
    }

    /// Whether leader election is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Name of the Lease resource.
    pub fn lease_name(&self) -> &str {
        &self.lease_name
    }

    /// Namespace holding the Lease.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identity of this replica.
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }
}

fn duration_from_env(var_name: &str, default: Duration) -> Duration {
    match std::env::var(var_name) {
        Ok(v) => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                warn!(
                    env_var = var_name,
                    value = %v,
                    error = %e,
                    default_secs = default.as_secs(),
                    "Failed to parse duration env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Lease-based leader election.
pub struct LeaderElection {
    lease_lock: LeaseLock,
    renew_interval: Duration,
}

impl LeaderElection {
    /// Create a leader election manager from a validated configuration.
    pub fn new(client: Client, config: &LeaderElectionConfig) -> Self {
        let lease_lock = LeaseLock::new(
            client,
            config.namespace(),
            LeaseLockParams {
                holder_id: config.holder_id().to_string(),
                lease_name: config.lease_name().to_string(),
                lease_ttl: config.lease_duration,
            },
        );

        Self {
            lease_lock,
            renew_interval: config.renew_interval,
        }
    }

    /// Block until this replica holds the lease. Retries indefinitely, so
    /// standbys wait here until the current leader dies or lets go.
    pub async fn acquire(&self) -> Result<()> {
        info!("Attempting to acquire leadership");

        loop {
            match self.lease_lock.try_acquire_or_renew().await {
                Ok(result) if result.acquired_lease => {
                    info!("Leadership acquired");
                    return Ok(());
                }
                Ok(result) => {
                    let holder = result
                        .lease
                        .as_ref()
                        .and_then(|l| l.spec.as_ref())
                        .and_then(|s| s.holder_identity.as_deref())
                        .unwrap_or("unknown");
                    info!(current_holder = %holder, "Another replica is leader, waiting");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to check leadership, retrying");
                }
            }

            tokio::time::sleep(self.renew_interval).await;
        }
    }

    /// Spawn the renewal loop. Losing the lease to another holder is
    /// definitive: the process exits immediately so a peer takes over with
    /// a full resync. Transient renewal failures are retried up to
    /// [`MAX_RENEWAL_FAILURES`] times.
    pub fn spawn_renewal_task(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.renew_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut consecutive_failures: u32 = 0;

            info!(
                interval_secs = self.renew_interval.as_secs(),
                "Starting lease renewal loop"
            );

            loop {
                interval.tick().await;

                match self.lease_lock.try_acquire_or_renew().await {
                    Ok(result) if result.acquired_lease => {
                        if consecutive_failures > 0 {
                            info!(
                                previous_failures = consecutive_failures,
                                "Lease renewed after transient failures"
                            );
                        }
                        consecutive_failures = 0;
                    }
                    Ok(result) => {
                        let new_holder = result
                            .lease
                            .as_ref()
                            .and_then(|l| l.spec.as_ref())
                            .and_then(|s| s.holder_identity.as_deref())
                            .unwrap_or("unknown");
                        error!(new_holder = %new_holder, "Lost leadership, exiting");
                        std::process::exit(1);
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        if consecutive_failures >= MAX_RENEWAL_FAILURES {
                            error!(
                                error = %e,
                                consecutive_failures,
                                "Failed to renew lease repeatedly, exiting"
                            );
                            std::process::exit(1);
                        }
                        warn!(
                            error = %e,
                            attempt = consecutive_failures,
                            max_attempts = MAX_RENEWAL_FAILURES,
                            "Transient lease renewal failure, will retry"
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn disabled_by_default() {
        std::env::remove_var("LEADER_ELECTION_ENABLED");

        let config = LeaderElectionConfig::from_env().unwrap();
        assert!(!config.enabled());
    }

    #[test]
    #[serial]
    fn enabled_requires_identity_vars() {
        std::env::set_var("LEADER_ELECTION_ENABLED", "true");
        std::env::remove_var("LEADER_ELECTION_LEASE_NAME");

        assert!(LeaderElectionConfig::from_env().is_err());

        std::env::remove_var("LEADER_ELECTION_ENABLED");
    }

    #[test]
    #[serial]
    fn from_env_reads_all_vars() {
        std::env::set_var("LEADER_ELECTION_ENABLED", "true");
        std::env::set_var("LEADER_ELECTION_LEASE_NAME", "agentic-operator-leader");
        std::env::set_var("POD_NAMESPACE", "agentic-system");
        std::env::set_var("POD_NAME", "agentic-operator-0");
        std::env::set_var("LEADER_ELECTION_LEASE_DURATION", "30");
        std::env::set_var("LEADER_ELECTION_RENEW_INTERVAL", "10");

        let config = LeaderElectionConfig::from_env().unwrap();
        assert!(config.enabled());
        assert_eq!(config.lease_name(), "agentic-operator-leader");
        assert_eq!(config.namespace(), "agentic-system");
        assert_eq!(config.holder_id(), "agentic-operator-0");

        for var in [
            "LEADER_ELECTION_ENABLED",
            "LEADER_ELECTION_LEASE_NAME",
            "POD_NAMESPACE",
            "POD_NAME",
            "LEADER_ELECTION_LEASE_DURATION",
            "LEADER_ELECTION_RENEW_INTERVAL",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn rejects_renew_interval_longer_than_lease() {
        let result = LeaderElectionConfig::new(
            "lease".to_string(),
            "ns".to_string(),
            "holder".to_string(),
            Duration::from_secs(10),
            Duration::from_secs(15),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_identity() {
        let result = LeaderElectionConfig::new(
            String::new(),
            "ns".to_string(),
            "holder".to_string(),
            Duration::from_secs(15),
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }
}
