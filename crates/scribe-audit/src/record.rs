//! Audit record types.
//!
//! One [`AuditRecord`] is produced per audited mutation. Records are built
//! once, appended to storage and never changed afterwards.

use chrono::{DateTime, Utc};
use scribe_core::config::audit::DEFAULT_SYSTEM_ACTOR;
use serde::{Deserialize, Serialize};

/// Kind of mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A new instance was saved.
    Insert,
    /// One or more attributes of an existing instance changed.
    Update,
    /// The instance was physically removed.
    Delete,
    /// Only the soft-delete flag changed, to true.
    SoftDelete,
    /// Only the soft-delete flag changed, to false.
    SoftRestore,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::SoftDelete => write!(f, "SOFT_DELETE"),
            Self::SoftRestore => write!(f, "SOFT_RESTORE"),
        }
    }
}

/// A changed attribute in stored form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field_name: String,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
}

/// An audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Surrogate key, assigned by storage on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Who performed the mutation. Never empty.
    pub auditor: String,

    /// When the record was created (UTC).
    pub datetime: DateTime<Utc>,

    /// Simple type name of the audited entity.
    pub entity_class_name: String,

    /// Canonical string form of the entity identity.
    pub entity_id: String,

    /// Natural key of the entity, if it declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_natural_id: Option<String>,

    pub action: AuditAction,

    /// Changed attributes; present only for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_fields: Option<Vec<FieldChange>>,
}

impl AuditRecord {
    /// Create a builder for an audit record.
    pub fn builder(
        action: AuditAction,
        entity_class_name: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> AuditRecordBuilder {
        AuditRecordBuilder::new(action, entity_class_name, entity_id)
    }

    /// Format the record as a human-readable log line.
    ///
    /// Format: `[timestamp] ACTION entity=Class#id auditor=... [changed_fields=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} entity={}#{} auditor={}",
            self.datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.action,
            self.entity_class_name,
            self.entity_id,
            self.auditor,
        );

        if let Some(id) = self.id {
            line.push_str(&format!(" id={}", id));
        }

        if let Some(ref natural_id) = self.entity_natural_id {
            line.push_str(&format!(" natural_id={}", natural_id));
        }

        if let Some(ref fields) = self.affected_fields {
            let names: Vec<&str> = fields.iter().map(|f| f.field_name.as_str()).collect();
            if !names.is_empty() {
                line.push_str(&format!(" changed_fields=[{}]", names.join(",")));
            }
        }

        line
    }
}

/// Builder for creating audit records.
#[derive(Debug)]
pub struct AuditRecordBuilder {
    record: AuditRecord,
}

impl AuditRecordBuilder {
    /// Create a new builder with required fields, stamped with the current
    /// time and the system actor.
    pub fn new(
        action: AuditAction,
        entity_class_name: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            record: AuditRecord {
                id: None,
                auditor: DEFAULT_SYSTEM_ACTOR.to_string(),
                datetime: Utc::now(),
                entity_class_name: entity_class_name.into(),
                entity_id: entity_id.into(),
                entity_natural_id: None,
                action,
                affected_fields: None,
            },
        }
    }

    /// Set the auditor. A blank auditor keeps the current one.
    pub fn auditor(mut self, auditor: impl Into<String>) -> Self {
        let auditor = auditor.into();
        if !auditor.trim().is_empty() {
            self.record.auditor = auditor;
        }
        self
    }

    /// Set the record timestamp.
    pub fn datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.record.datetime = datetime;
        self
    }

    /// Set the natural key.
    pub fn natural_id(mut self, natural_id: Option<String>) -> Self {
        self.record.entity_natural_id = natural_id;
        self
    }

    /// Set the changed attributes. Ignored unless the action is an update.
    pub fn affected_fields(mut self, fields: Vec<FieldChange>) -> Self {
        if self.record.action == AuditAction::Update {
            self.record.affected_fields = Some(fields);
        }
        self
    }

    /// Build the audit record.
    pub fn build(self) -> AuditRecord {
        self.record
    }
}
