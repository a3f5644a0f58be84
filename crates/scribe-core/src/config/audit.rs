//! Audit engine configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Actor recorded when no current auditor can be resolved.
pub const DEFAULT_SYSTEM_ACTOR: &str = "SYSTEM";

/// Attribute whose lone change marks a soft delete or restore.
pub const DEFAULT_SOFT_DELETE_FIELD: &str = "deleted";

/// Configuration for the mutation audit engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit records are produced at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Actor written when the actor resolver yields nothing.
    #[serde(default = "default_system_actor")]
    pub system_actor: String,

    /// Name of the boolean soft-delete flag attribute.
    #[serde(default = "default_soft_delete_field")]
    pub soft_delete_field: String,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage backend type.
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path (for file backend).
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Storage backend type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Keep records in process memory.
    #[default]
    Memory,
    /// Print records to stdout as JSON lines.
    Console,
    /// Append records to a JSON Lines file.
    File,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            system_actor: default_system_actor(),
            soft_delete_field: default_soft_delete_field(),
            storage: StorageConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Check that the configuration can drive the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_actor.trim().is_empty() {
            return Err(ConfigError::Config(
                "audit.system_actor must not be empty".to_string(),
            ));
        }
        if self.soft_delete_field.trim().is_empty() {
            return Err(ConfigError::Config(
                "audit.soft_delete_field must not be empty".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::File
            && self
                .storage
                .file_path
                .as_deref()
                .is_some_and(|p| p.trim().is_empty())
        {
            return Err(ConfigError::Config(
                "audit.storage.file_path must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_system_actor() -> String {
    DEFAULT_SYSTEM_ACTOR.to_string()
}

fn default_soft_delete_field() -> String {
    DEFAULT_SOFT_DELETE_FIELD.to_string()
}
