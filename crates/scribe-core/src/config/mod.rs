//! Configuration types for Scribe.
//!
//! Configuration is loaded from a single YAML file (scribe.yaml). Every
//! section is optional and falls back to its `Default` implementation.

pub mod audit;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use audit::{AuditConfig, StorageBackend, StorageConfig};

/// Complete Scribe configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Audit engine configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScribeConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.audit.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
project: billing
audit:
  enabled: true
  system_actor: batch-job
  soft_delete_field: archived
  storage:
    backend: file
    file_path: /var/log/scribe/audit.log
"#;

        let config = ScribeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.as_deref(), Some("billing"));
        assert_eq!(config.audit.system_actor, "batch-job");
        assert_eq!(config.audit.soft_delete_field, "archived");
        assert_eq!(config.audit.storage.backend, StorageBackend::File);
        assert_eq!(
            config.audit.storage.file_path.as_deref(),
            Some("/var/log/scribe/audit.log")
        );
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ScribeConfig::from_yaml("{}").unwrap();
        assert!(config.project.is_none());
        assert!(config.audit.enabled);
        assert_eq!(config.audit.system_actor, "SYSTEM");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let yaml = "audit:\n  soft_delete_field: \"\"\n";
        assert!(matches!(
            ScribeConfig::from_yaml(yaml),
            Err(ConfigError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "audit:\n  enabled: false").unwrap();

        let config = ScribeConfig::from_file(file.path()).unwrap();
        assert!(!config.audit.enabled);
    }
}
