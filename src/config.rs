use serde::{Deserialize, Serialize};

const DEFAULT_ENVIRONMENT_LABEL: &str = "Default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub control_plane: ControlPlaneConfig,
    pub publisher: PublisherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings describing the control plane this agent is connected to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// Provider recorded on imported APIs when the event names none
    pub provider: String,
    /// Gateway environments every revision is deployed to
    pub environment_labels: Vec<String>,
    /// Tenant applied to mirrored entities that arrive without one
    pub tenant_domain: String,
}

/// Management backend the finished archives are imported into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    pub insecure_skip_verify: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            control_plane: ControlPlaneConfig::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9443,
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            provider: "admin".to_string(),
            environment_labels: vec![DEFAULT_ENVIRONMENT_LABEL.to_string()],
            tenant_domain: "carbon.super".to_string(),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:9443".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            timeout_secs: 30,
            insecure_skip_verify: false,
        }
    }
}

impl ControlPlaneConfig {
    /// Configured labels, falling back to `Default` when none are set
    pub fn environments(&self) -> Vec<String> {
        if self.environment_labels.is_empty() {
            vec![DEFAULT_ENVIRONMENT_LABEL.to_string()]
        } else {
            self.environment_labels.clone()
        }
    }

    /// Environment a revision is undeployed from
    pub fn primary_environment(&self) -> String {
        self.environment_labels
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT_LABEL.to_string())
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // Add environment variables with prefix "AGENT_", e.g. AGENT_SERVER__PORT
        config = config.add_source(
            config::Environment::with_prefix("AGENT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("control_plane.environment_labels")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "0.0.0.0:9443");
        assert_eq!(config.control_plane.environments(), vec!["Default"]);
        assert_eq!(config.control_plane.primary_environment(), "Default");
        assert_eq!(config.control_plane.tenant_domain, "carbon.super");
    }

    #[test]
    fn test_empty_labels_fall_back_to_default() {
        let control_plane = ControlPlaneConfig {
            environment_labels: Vec::new(),
            ..Default::default()
        };
        assert_eq!(control_plane.environments(), vec!["Default"]);
        assert_eq!(control_plane.primary_environment(), "Default");
    }
}
