//! Save/delete interception.
//!
//! [`AuditedRepository`] decorates a [`Repository`] so every save and delete
//! produces an audit record without the caller writing audit code.

use async_trait::async_trait;
use scribe_core::{AuditValue, Auditable};
use std::sync::Arc;

use crate::context::{RepositoryContext, SnapshotSource};
use crate::error::AuditError;
use crate::service::AuditService;

/// A store of one audited entity type.
///
/// The repository doubles as the [`RepositoryContext`] through which prior
/// snapshots are looked up.
#[async_trait]
pub trait Repository: RepositoryContext {
    type Entity: Auditable + PartialEq + 'static;

    /// Simple name of the stored type, used when a delete has no snapshot.
    fn entity_name(&self) -> &str;

    /// Persist `entity` and return the stored state.
    async fn save(&self, entity: Self::Entity) -> anyhow::Result<Self::Entity>;

    async fn delete(&self, entity: &Self::Entity) -> anyhow::Result<()>;

    async fn delete_by_id(&self, id: &AuditValue) -> anyhow::Result<()>;
}

/// Audits every mutation made through the wrapped repository.
pub struct AuditedRepository<R> {
    inner: R,
    audit: Arc<AuditService>,
}

impl<R: Repository> AuditedRepository<R> {
    pub fn new(inner: R, audit: Arc<AuditService>) -> Self {
        Self { inner, audit }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// Save and record INSERT, UPDATE, SOFT_DELETE or SOFT_RESTORE.
    ///
    /// Nothing is recorded when the save itself fails. A failure to record
    /// is returned even though the save went through.
    pub async fn save(&self, entity: R::Entity) -> Result<R::Entity, AuditError> {
        if !self.audit.is_enabled() {
            return Ok(self.inner.save(entity).await?);
        }

        let id = self.audit.entity_id(&entity)?;
        let before = self.audit.snapshot_before(id.as_ref(), &self.inner).await?;

        let saved = self.inner.save(entity).await?;

        self.audit
            .record_mutation(before.as_ref().map(|b| b.as_auditable()), &saved)
            .await?;
        Ok(saved)
    }

    /// Delete and record DELETE from the full entity.
    pub async fn delete(&self, entity: &R::Entity) -> Result<(), AuditError> {
        self.inner.delete(entity).await?;
        self.audit.record_delete(entity).await?;
        Ok(())
    }

    /// Delete by identity and record DELETE.
    ///
    /// The snapshot is fetched before the delete runs, so the record carries
    /// the entity's natural key when it existed.
    pub async fn delete_by_id(&self, id: &AuditValue) -> Result<(), AuditError> {
        let snapshot = if self.audit.is_enabled() {
            self.audit.snapshot_before(Some(id), &self.inner).await?
        } else {
            None
        };

        self.inner.delete_by_id(id).await?;

        self.audit
            .record_delete_snapshot(id, self.inner.entity_name(), snapshot.as_ref())
            .await?;
        Ok(())
    }
}

impl<R: Repository> RepositoryContext for AuditedRepository<R> {
    fn snapshot_source(&self) -> Option<&dyn SnapshotSource> {
        None
    }

    fn parent_context(&self) -> Option<&dyn RepositoryContext> {
        Some(&self.inner)
    }
}
