//! Audit service implementation.
//!
//! [`AuditService`] ties the engine together: it reads identities through
//! the type metadata cache, fetches prior snapshots, classifies each save,
//! builds the [`AuditRecord`] and hands it to the configured sink.

use scribe_core::{AuditConfig, AuditValue, Auditable, ObjectRef};
use std::sync::Arc;

use crate::actor::{ActorResolver, NoActor};
use crate::classify::{Classification, classify};
use crate::context::RepositoryContext;
use crate::diff::diff;
use crate::error::AuditError;
use crate::record::{AuditAction, AuditRecord, FieldChange};
use crate::registry::TypeRegistry;
use crate::render::BoundedRenderer;
use crate::storage::{AuditFilter, AuditSink, MemorySink, NullSink, create_sink};

/// The mutation audit engine.
pub struct AuditService {
    config: AuditConfig,
    registry: Arc<TypeRegistry>,
    actors: Arc<dyn ActorResolver>,
    sink: Arc<dyn AuditSink>,
}

impl AuditService {
    /// Create a service whose sink is built from `config.storage`.
    pub fn new(
        config: AuditConfig,
        registry: Arc<TypeRegistry>,
        actors: Arc<dyn ActorResolver>,
    ) -> Result<Self, AuditError> {
        let sink: Arc<dyn AuditSink> = if config.enabled {
            Arc::from(create_sink(&config.storage)?)
        } else {
            Arc::new(NullSink)
        };

        Ok(Self {
            config,
            registry,
            actors,
            sink,
        })
    }

    /// Create a service with a custom sink.
    pub fn with_sink(
        config: AuditConfig,
        registry: Arc<TypeRegistry>,
        actors: Arc<dyn ActorResolver>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            registry,
            actors,
            sink,
        }
    }

    /// Create a disabled (no-op) service.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            registry: Arc::new(TypeRegistry::new()),
            actors: Arc::new(NoActor),
            sink: Arc::new(NullSink),
        }
    }

    /// Create an enabled service keeping records in memory (useful for tests).
    pub fn in_memory(actors: Arc<dyn ActorResolver>) -> Self {
        Self::with_sink(
            AuditConfig::default(),
            Arc::new(TypeRegistry::new()),
            actors,
            Arc::new(MemorySink::new()),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Identity value of `entity`; `Ok(None)` when it is null.
    pub fn entity_id(&self, entity: &dyn Auditable) -> Result<Option<AuditValue>, AuditError> {
        self.registry.describe(entity)?.read_identity(entity)
    }

    /// Persisted state for `id`, looked up through `context`.
    ///
    /// A missing id, a context chain without a lookup capability and a
    /// lookup miss all yield `Ok(None)`. A failing lookup is an error.
    pub async fn snapshot_before(
        &self,
        id: Option<&AuditValue>,
        context: &dyn RepositoryContext,
    ) -> Result<Option<ObjectRef>, AuditError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let Some(accessor) = self.registry.lookup_accessor(context)? else {
            return Ok(None);
        };
        let Some(source) = accessor.resolve(context) else {
            return Ok(None);
        };

        let snapshot = source.find_by_id(id).await?;
        tracing::debug!(
            context = context.context_path(),
            entity_id = %id,
            found = snapshot.is_some(),
            "Fetched snapshot before mutation"
        );
        Ok(snapshot)
    }

    /// Record a save.
    ///
    /// Returns the stored record, or `None` when nothing changed or auditing
    /// is disabled.
    pub async fn record_mutation(
        &self,
        before: Option<&dyn Auditable>,
        after: &dyn Auditable,
    ) -> Result<Option<AuditRecord>, AuditError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let metadata = self.registry.describe(after)?;
        let identity = metadata.read_identity(after)?;

        let classification = classify(
            before.is_some(),
            identity.is_some(),
            || diff(before, Some(after), &metadata),
            &self.config.soft_delete_field,
        );

        let Some(action) = classification.action() else {
            tracing::debug!(
                entity = metadata.type_name(),
                "No audited attribute changed; skipping record"
            );
            return Ok(None);
        };

        let mut builder =
            AuditRecord::builder(action, metadata.type_name(), canonical_id(identity.as_ref()))
                .auditor(self.resolve_actor())
                .natural_id(metadata.read_natural_key(after));

        if let Classification::Update(fields) = &classification {
            let renderer = BoundedRenderer::new(&self.registry);
            let changes = fields
                .iter()
                .map(|field| renderer.render_field(field))
                .collect::<Result<Vec<FieldChange>, _>>()?;
            builder = builder.affected_fields(changes);
        }

        self.persist(builder.build()).await.map(Some)
    }

    /// Record the physical delete of a fully loaded entity.
    pub async fn record_delete(
        &self,
        entity: &dyn Auditable,
    ) -> Result<Option<AuditRecord>, AuditError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let metadata = self.registry.describe(entity)?;
        let identity = metadata.read_identity(entity)?;

        let record = AuditRecord::builder(
            AuditAction::Delete,
            metadata.type_name(),
            canonical_id(identity.as_ref()),
        )
        .auditor(self.resolve_actor())
        .natural_id(metadata.read_natural_key(entity))
        .build();

        self.persist(record).await.map(Some)
    }

    /// Record a delete issued by identity only.
    ///
    /// The persisted snapshot is preferred; without one the record carries
    /// the bare identity and `entity_name`. Call this before the physical
    /// delete so the snapshot can still be found.
    pub async fn record_delete_by_id(
        &self,
        id: &AuditValue,
        entity_name: &str,
        context: &dyn RepositoryContext,
    ) -> Result<Option<AuditRecord>, AuditError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let snapshot = self.snapshot_before(Some(id), context).await?;
        self.record_delete_snapshot(id, entity_name, snapshot.as_ref())
            .await
    }

    /// Record a delete from an already fetched (possibly absent) snapshot.
    pub async fn record_delete_snapshot(
        &self,
        id: &AuditValue,
        entity_name: &str,
        snapshot: Option<&ObjectRef>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        if !self.config.enabled {
            return Ok(None);
        }

        if let Some(snapshot) = snapshot {
            return self.record_delete(snapshot.as_auditable()).await;
        }

        let record = AuditRecord::builder(AuditAction::Delete, entity_name, id.to_string())
            .auditor(self.resolve_actor())
            .build();

        self.persist(record).await.map(Some)
    }

    /// Current actor, or the configured system actor.
    pub fn resolve_actor(&self) -> String {
        self.actors
            .current_actor()
            .filter(|actor| !actor.trim().is_empty())
            .unwrap_or_else(|| self.config.system_actor.clone())
    }

    /// Query the audit trail.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        self.sink.query(filter).await
    }

    /// Get a stored record by id.
    pub async fn get(&self, id: u64) -> Result<Option<AuditRecord>, AuditError> {
        self.sink.get(id).await
    }

    /// Count records matching a filter.
    pub async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.sink.count(filter).await
    }

    async fn persist(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        let stored = self.sink.append(record).await?;

        tracing::debug!(
            id = stored.id,
            action = %stored.action,
            entity = %stored.entity_class_name,
            "Audit record stored: {}",
            stored.to_log_line()
        );

        Ok(stored)
    }
}

fn canonical_id(identity: Option<&AuditValue>) -> String {
    identity
        .map(ToString::to_string)
        .unwrap_or_else(|| AuditValue::Null.to_string())
}
