//! Type metadata cache.
//!
//! [`TypeRegistry`] turns the declarative [`EntitySchema`] of each audited
//! type into a [`TypeMetadata`] the first time the type is seen and keeps it
//! for the life of the registry. Entries are immutable once published, so
//! readers only ever see complete metadata. Two callers racing on the same
//! new type may both compute it; the first insert wins.

use scribe_core::{AttributeError, AttributeRole, AuditValue, Auditable, EntitySchema};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::context::{LookupAccessor, RepositoryContext};
use crate::error::AuditError;

/// Name of an audited attribute plus the means to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    name: String,
}

impl AttributeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read this attribute from an instance of the described type.
    pub fn read(&self, object: &dyn Auditable) -> Result<AuditValue, AttributeError> {
        object.attribute(&self.name)
    }
}

/// Everything the engine needs to know about one audited type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMetadata {
    type_path: String,
    type_name: String,
    auditable: Vec<AttributeDescriptor>,
    identity: Option<AttributeDescriptor>,
    natural_key: Option<AttributeDescriptor>,
}

impl TypeMetadata {
    /// Derive metadata from a schema, walking the type and then its ancestors.
    pub fn from_schema(type_path: &str, schema: &EntitySchema) -> Result<Self, AuditError> {
        let mut auditable: Vec<AttributeDescriptor> = Vec::new();
        let mut identity: Option<AttributeDescriptor> = None;
        let mut natural_key: Option<AttributeDescriptor> = None;
        let mut seen: Vec<&str> = Vec::new();

        for spec in schema.all_attributes() {
            if seen.contains(&spec.name.as_str()) {
                // Redeclared by an ancestor; the most-derived declaration wins.
                tracing::debug!(
                    type_path = type_path,
                    attribute = %spec.name,
                    "Ignoring shadowed attribute declaration"
                );
                continue;
            }
            seen.push(&spec.name);

            let descriptor = AttributeDescriptor {
                name: spec.name.clone(),
            };

            if spec.has_role(AttributeRole::Identity) {
                if let Some(first) = &identity {
                    return Err(AuditError::AmbiguousIdentity {
                        type_path: type_path.to_string(),
                        first: first.name.clone(),
                        second: spec.name.clone(),
                    });
                }
                identity = Some(descriptor.clone());
            }

            if spec.has_role(AttributeRole::NaturalKey) && natural_key.is_none() {
                natural_key = Some(descriptor.clone());
            }

            if spec.is_auditable() {
                auditable.push(descriptor);
            }
        }

        Ok(Self {
            type_path: type_path.to_string(),
            type_name: schema.name().to_string(),
            auditable,
            identity,
            natural_key,
        })
    }

    /// Fully-qualified type path (the cache key).
    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    /// Simple type name written to audit records.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Attributes tracked by diffs and rendering, in declaration order.
    pub fn auditable_attributes(&self) -> &[AttributeDescriptor] {
        &self.auditable
    }

    pub fn identity_attribute(&self) -> Option<&AttributeDescriptor> {
        self.identity.as_ref()
    }

    pub fn natural_key_attribute(&self) -> Option<&AttributeDescriptor> {
        self.natural_key.as_ref()
    }

    /// Read the identity value; `Ok(None)` when the value is null.
    pub fn read_identity(&self, object: &dyn Auditable) -> Result<Option<AuditValue>, AuditError> {
        let identity = self
            .identity
            .as_ref()
            .ok_or_else(|| AuditError::MissingIdentity(self.type_path.clone()))?;
        let value = identity.read(object)?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Canonical string of the natural key, if the type declares one.
    ///
    /// A read failure is logged and treated as no natural key.
    pub fn read_natural_key(&self, object: &dyn Auditable) -> Option<String> {
        let natural_key = self.natural_key.as_ref()?;
        match natural_key.read(object) {
            Ok(value) => Some(value.to_string()),
            Err(e) => {
                tracing::warn!(
                    type_path = %self.type_path,
                    attribute = natural_key.name(),
                    error = %e,
                    "Failed to read natural key"
                );
                None
            }
        }
    }
}

/// Process-wide cache of [`TypeMetadata`] and lookup accessors.
///
/// Create one at startup and share it by `Arc` with every component that
/// needs type information.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<TypeMetadata>>>,
    lookups: RwLock<HashMap<&'static str, Option<LookupAccessor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for the type of `object`, computed on first use.
    pub fn describe(&self, object: &dyn Auditable) -> Result<Arc<TypeMetadata>, AuditError> {
        let key = object.type_path();

        {
            let types = self.types.read().map_err(|e| {
                AuditError::Internal(format!("Failed to acquire read lock: {}", e))
            })?;
            if let Some(metadata) = types.get(key) {
                return Ok(Arc::clone(metadata));
            }
        }

        // Computed outside the lock; a racing writer may publish first.
        let metadata = Arc::new(TypeMetadata::from_schema(key, &object.schema())?);

        let mut types = self.types.write().map_err(|e| {
            AuditError::Internal(format!("Failed to acquire write lock: {}", e))
        })?;
        let published = types.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(
                type_path = key,
                auditable = metadata.auditable.len(),
                identity = metadata.identity.as_ref().map(|a| a.name.as_str()),
                natural_key = metadata.natural_key.as_ref().map(|a| a.name.as_str()),
                "Described audited type"
            );
            Arc::clone(&metadata)
        });
        Ok(Arc::clone(published))
    }

    /// Where on `context`'s chain the "find by identity" capability lives.
    ///
    /// The chain is searched at most once per concrete context type; a miss
    /// is cached as `None`.
    pub fn lookup_accessor(
        &self,
        context: &dyn RepositoryContext,
    ) -> Result<Option<LookupAccessor>, AuditError> {
        let key = context.context_path();

        {
            let lookups = self.lookups.read().map_err(|e| {
                AuditError::Internal(format!("Failed to acquire read lock: {}", e))
            })?;
            if let Some(accessor) = lookups.get(key) {
                return Ok(*accessor);
            }
        }

        let mut found = None;
        let mut current = Some(context);
        let mut depth = 0;
        while let Some(ctx) = current {
            if ctx.snapshot_source().is_some() {
                found = Some(LookupAccessor::at_depth(depth));
                break;
            }
            current = ctx.parent_context();
            depth += 1;
        }

        tracing::debug!(
            context = key,
            found = found.is_some(),
            depth = found.map(|a| a.depth()),
            "Resolved snapshot lookup capability"
        );

        let mut lookups = self.lookups.write().map_err(|e| {
            AuditError::Internal(format!("Failed to acquire write lock: {}", e))
        })?;
        Ok(*lookups.entry(key).or_insert(found))
    }

    /// Whether metadata for `type_path` has been computed.
    pub fn contains(&self, type_path: &str) -> bool {
        self.types
            .read()
            .map(|types| types.contains_key(type_path))
            .unwrap_or(false)
    }

    /// Number of described types.
    pub fn len(&self) -> usize {
        self.types.read().map(|types| types.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
