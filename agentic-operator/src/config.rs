//! Operator-level process configuration.
//!
//! Supplied through environment variables so the Helm chart stays the
//! single source of deployment-time settings.

use tracing::warn;

/// Compiled-in fallback for the agent runtime image, used when neither the
/// Agent spec nor the operator environment names one.
pub const FALLBACK_AGENT_IMAGE: &str = "ghcr.io/agentic/agent-runtime:latest";

/// Default port for the operator's own health endpoints.
pub const DEFAULT_HEALTH_PORT: u16 = 8081;

/// Operator configuration loaded once at startup.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Default agent runtime image, overridable per Agent via `spec.image`.
    pub default_image: String,
    /// Port the health server binds on.
    pub health_port: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_image: FALLBACK_AGENT_IMAGE.to_string(),
            health_port: DEFAULT_HEALTH_PORT,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables.
    ///
    /// - `AGENT_DEFAULT_IMAGE`: default agent runtime image
    /// - `HEALTH_PORT`: health server port (default: 8081)
    pub fn from_env() -> Self {
        let default_image = std::env::var("AGENT_DEFAULT_IMAGE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| FALLBACK_AGENT_IMAGE.to_string());

        let health_port = match std::env::var("HEALTH_PORT") {
            Ok(v) => match v.parse::<u16>() {
                Ok(port) => port,
                Err(e) => {
                    warn!(
                        value = %v,
                        error = %e,
                        default_port = DEFAULT_HEALTH_PORT,
                        "Failed to parse HEALTH_PORT, using default"
                    );
                    DEFAULT_HEALTH_PORT
                }
            },
            Err(_) => DEFAULT_HEALTH_PORT,
        };

        Self {
            default_image,
            health_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_uses_fallbacks() {
        std::env::remove_var("AGENT_DEFAULT_IMAGE");
        std::env::remove_var("HEALTH_PORT");

        let config = OperatorConfig::from_env();
        assert_eq!(config.default_image, FALLBACK_AGENT_IMAGE);
        assert_eq!(config.health_port, DEFAULT_HEALTH_PORT);
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        std::env::set_var("AGENT_DEFAULT_IMAGE", "registry.local/agent:v2");
        std::env::set_var("HEALTH_PORT", "9000");

        let config = OperatorConfig::from_env();
        assert_eq!(config.default_image, "registry.local/agent:v2");
        assert_eq!(config.health_port, 9000);

        std::env::remove_var("AGENT_DEFAULT_IMAGE");
        std::env::remove_var("HEALTH_PORT");
    }

    #[test]
    #[serial]
    fn invalid_port_falls_back() {
        std::env::set_var("HEALTH_PORT", "not-a-port");

        let config = OperatorConfig::from_env();
        assert_eq!(config.health_port, DEFAULT_HEALTH_PORT);

        std::env::remove_var("HEALTH_PORT");
    }
}
