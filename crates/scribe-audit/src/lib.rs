//! # scribe-audit
//!
//! Mutation audit engine for persisted domain objects.
//!
//! This crate provides functionality for:
//! - Describing audited types once and caching the result ([`TypeRegistry`])
//! - Diffing the before and after state of a saved object ([`diff()`])
//! - Classifying saves as insert, update, soft delete or soft restore
//! - Rendering changed values with a bounded depth ([`BoundedRenderer`])
//! - Building and storing append-only [`AuditRecord`]s
//! - Auditing a repository transparently ([`AuditedRepository`])
//!
//! ## Actions
//!
//! | Action | When |
//! |--------|------|
//! | `INSERT` | No prior state and the saved object has an identity |
//! | `UPDATE` | One or more audited attributes changed |
//! | `SOFT_DELETE` | Only the soft-delete flag changed, to `true` |
//! | `SOFT_RESTORE` | Only the soft-delete flag changed, to `false` |
//! | `DELETE` | Explicit delete, no diff computed |
//!
//! A save that changes nothing produces no record.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use scribe_audit::{AuditService, FixedActor};
//! use scribe_core::{AttributeError, AuditValue, Auditable, EntitySchema};
//! use std::sync::Arc;
//!
//! #[derive(Clone, PartialEq)]
//! struct Invoice {
//!     id: i64,
//!     total: i64,
//! }
//!
//! impl Auditable for Invoice {
//!     fn schema(&self) -> EntitySchema {
//!         EntitySchema::builder("Invoice").identity("id").attribute("total").build()
//!     }
//!
//!     fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
//!         match name {
//!             "id" => Ok(self.id.into()),
//!             "total" => Ok(self.total.into()),
//!             other => Err(AttributeError::not_found(other)),
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audit = AuditService::in_memory(Arc::new(FixedActor::new("billing")));
//!
//! let before = Invoice { id: 1, total: 100 };
//! let after = Invoice { id: 1, total: 120 };
//!
//! let record = audit.record_mutation(Some(&before), &after).await?;
//! assert!(record.is_some());
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod classify;
pub mod context;
pub mod diff;
pub mod error;
pub mod interceptor;
pub mod record;
pub mod registry;
pub mod render;
pub mod service;
pub mod storage;

#[cfg(test)]
mod fixtures;

pub use actor::{ActorResolver, FixedActor, NoActor, TaskActor};
pub use classify::{Classification, classify, classify_diff};
pub use context::{LookupAccessor, RepositoryContext, SnapshotSource};
pub use diff::{AffectedField, FieldDiff, FieldEntry, Slot, diff};
pub use error::AuditError;
pub use interceptor::{AuditedRepository, Repository};
pub use record::{AuditAction, AuditRecord, AuditRecordBuilder, FieldChange};
pub use registry::{AttributeDescriptor, TypeMetadata, TypeRegistry};
pub use render::{BoundedRenderer, MAX_DEPTH, NULL_MARKER, OMITTED_MARKER};
pub use service::AuditService;
pub use storage::{
    AuditFilter, AuditSink, ConsoleSink, JsonLinesSink, MemorySink, NullSink, create_sink,
};
