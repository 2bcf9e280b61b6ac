//! Checker configuration

use crate::cli::{Cli, Commands, OutputFormat};
use gatehouse_core::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Checker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Policy document path
    #[serde(default = "default_policy_path")]
    pub policy_path: String,

    /// Request fixture path
    #[serde(default = "default_request_path")]
    pub request_path: String,

    /// Profiles tried by `check`, in order
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Controller name, overriding the fixture's
    #[serde(default)]
    pub controller: Option<String>,

    /// Actions that skip authorization
    #[serde(default)]
    pub unrestricted: Vec<String>,

    #[serde(default)]
    pub output: OutputFormat,
}

impl CheckConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content).map_err(|e| {
                Error::config(format!("invalid configuration '{}': {}", config_path, e))
            })?
        } else {
            debug!(path = config_path, "no configuration file, using defaults");
            Self::default()
        };

        if let Some(policy) = &cli.policy {
            config.policy_path = policy.clone();
        }

        if let Some(request) = &cli.request {
            config.request_path = request.clone();
        }

        if let Commands::Check {
            profiles,
            controller,
            output,
        } = &cli.command
        {
            if !profiles.is_empty() {
                config.profiles = profiles.clone();
            }
            if let Some(controller) = controller {
                config.controller = Some(controller.clone());
            }
            if let Some(output) = output {
                config.output = *output;
            }
        }

        Ok(config)
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
            request_path: default_request_path(),
            profiles: Vec::new(),
            controller: None,
            unrestricted: Vec::new(),
            output: OutputFormat::Text,
        }
    }
}

fn default_policy_path() -> String {
    "./policy.yaml".to_string()
}

fn default_request_path() -> String {
    "./request.yaml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = Cli::parse_from(["gatehouse", "lint"]);
        let config = CheckConfig::load("/nonexistent/gatehouse.yaml", &cli).unwrap();
        assert_eq!(config, CheckConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "gatehouse",
            "--policy",
            "p.yaml",
            "check",
            "--profile",
            "admin,member",
            "--output",
            "json",
        ]);
        let config = CheckConfig::load("/nonexistent/gatehouse.yaml", &cli).unwrap();

        assert_eq!(config.policy_path, "p.yaml");
        assert_eq!(config.request_path, "./request.yaml");
        assert_eq!(config.profiles, vec!["admin", "member"]);
        assert_eq!(config.output, OutputFormat::Json);
    }
}
