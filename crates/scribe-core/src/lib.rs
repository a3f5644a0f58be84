//! # scribe-core
//!
//! Shared types for the Scribe mutation audit engine:
//!
//! - [`value`]: the tagged [`AuditValue`] model every attribute is read as
//! - [`schema`]: declarative per-type configuration and the [`Auditable`] trait
//! - [`config`]: YAML-backed engine configuration

pub mod config;
pub mod schema;
pub mod value;

pub use config::{AuditConfig, ConfigError, ScribeConfig, StorageBackend, StorageConfig};
pub use schema::{AttributeError, AttributeRole, AttributeSpec, Auditable, EntitySchema};
pub use value::{AuditNumber, AuditValue, ObjectRef};
