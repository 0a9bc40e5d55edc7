//! Audit configuration loader.

use std::path::Path;

use serde::Deserialize;

use crate::error::AuditError;
use audient_policy::{PolicyTarget, PolicyTargetFormatter};

fn default_num_workers() -> usize {
    1
}

fn default_response_timeout_secs() -> f64 {
    5.0
}

fn default_llm_hosts() -> Vec<String> {
    [
        "api.openai.com",
        "api.anthropic.com",
        "api.cohere.ai",
        "api.mistral.ai",
        "api.groq.com",
        "api.together.xyz",
        "localhost",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Audit engine configuration.
///
/// Without `policy_path`/`ontology_path` compliance checking is disabled;
/// extraction and graph building still run.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub policy_path: Option<String>,
    #[serde(default)]
    pub ontology_path: Option<String>,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: f64,
    /// LLM API hosts the interception layer should watch.
    #[serde(default = "default_llm_hosts")]
    pub llm_hosts: Vec<String>,
    /// Webhook URLs registered as notification sinks at startup.
    #[serde(default)]
    pub webhooks: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            policy_path: None,
            ontology_path: None,
            num_workers: default_num_workers(),
            response_timeout_secs: default_response_timeout_secs(),
            llm_hosts: default_llm_hosts(),
            webhooks: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file is missing, empty or invalid YAML.
    pub fn load(config_path: &str) -> Result<Self, AuditError> {
        let config_file = Path::new(config_path);
        if !config_file.exists() {
            return Err(AuditError::Config(format!(
                "Config file not found: {}",
                config_path
            )));
        }

        let content = std::fs::read_to_string(config_file)?;
        if content.trim().is_empty() {
            return Err(AuditError::Config("Config file is empty".to_string()));
        }

        let config: AuditConfig = serde_yaml::from_str(&content)
            .map_err(|e| AuditError::Config(format!("Invalid YAML: {}", e)))?;

        if config.num_workers == 0 {
            return Err(AuditError::Config(
                "num_workers must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Expand the configured policy file into fine-grained targets.
    ///
    /// `Ok(None)` means compliance checking is disabled (no policy file).
    pub fn build_policy_targets(&self) -> Result<Option<Vec<PolicyTarget>>, AuditError> {
        match (&self.policy_path, &self.ontology_path) {
            (None, None) => Ok(None),
            (Some(policy), Some(ontology)) => {
                let formatter = PolicyTargetFormatter::from_files(policy, ontology)?;
                Ok(Some(formatter.format_target_policy()))
            }
            _ => Err(AuditError::Config(
                "policy_path and ontology_path must be set together".to_string(),
            )),
        }
    }
}
