//! Declarative per-type audit configuration.
//!
//! A type opts into auditing by implementing [`Auditable`]: it declares its
//! attributes once through an [`EntitySchema`] and answers attribute reads
//! by name. Nothing is discovered at runtime beyond what the schema states.
//!
//! ```
//! use scribe_core::{AttributeError, Auditable, AuditValue, EntitySchema};
//!
//! struct Customer {
//!     id: i64,
//!     email: String,
//!     password_hash: String,
//! }
//!
//! impl Auditable for Customer {
//!     fn schema(&self) -> EntitySchema {
//!         EntitySchema::builder("Customer")
//!             .identity("id")
//!             .natural_key("email")
//!             .excluded("password_hash")
//!             .build()
//!     }
//!
//!     fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
//!         match name {
//!             "id" => Ok(self.id.into()),
//!             "email" => Ok(self.email.as_str().into()),
//!             "password_hash" => Ok(self.password_hash.as_str().into()),
//!             _ => Err(AttributeError::not_found(name)),
//!         }
//!     }
//! }
//! ```

use crate::value::AuditValue;

/// Marker attached to an attribute declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeRole {
    /// The single attribute that identifies an instance.
    Identity,
    /// Secondary, business-meaningful key. Still audited.
    NaturalKey,
    /// Bookkeeping: who created the instance.
    CreatedBy,
    /// Bookkeeping: when the instance was created.
    CreatedAt,
    /// Bookkeeping: who last modified the instance.
    LastModifiedBy,
    /// Bookkeeping: when the instance was last modified.
    LastModifiedAt,
    /// Never audited (secrets, derived data).
    Excluded,
}

impl AttributeRole {
    /// Whether carrying this role removes an attribute from the audited set.
    pub fn excludes_from_audit(self) -> bool {
        !matches!(self, Self::NaturalKey)
    }
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: String,
    pub roles: Vec<AttributeRole>,
}

impl AttributeSpec {
    pub fn has_role(&self, role: AttributeRole) -> bool {
        self.roles.contains(&role)
    }

    /// True unless one of the roles is in the exclusion set.
    pub fn is_auditable(&self) -> bool {
        !self.roles.iter().any(|r| r.excludes_from_audit())
    }
}

/// Declared shape of an auditable type, optionally extending a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    name: String,
    attributes: Vec<AttributeSpec>,
    parent: Option<Box<EntitySchema>>,
}

impl EntitySchema {
    /// Start declaring a type under its simple name.
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            schema: EntitySchema {
                name: name.into(),
                attributes: Vec::new(),
                parent: None,
            },
        }
    }

    /// Simple type name recorded in audit records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes declared directly on this type, in declaration order.
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn parent(&self) -> Option<&EntitySchema> {
        self.parent.as_deref()
    }

    /// This schema followed by each ancestor up to the root.
    pub fn lineage(&self) -> impl Iterator<Item = &EntitySchema> {
        std::iter::successors(Some(self), |s| s.parent())
    }

    /// Own attributes first, then each ancestor's in turn.
    pub fn all_attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.lineage().flat_map(|s| s.attributes.iter())
    }
}

/// Builder for [`EntitySchema`].
#[derive(Debug)]
pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    /// Declare a plain audited attribute.
    pub fn attribute(self, name: impl Into<String>) -> Self {
        self.with_roles(name, std::iter::empty())
    }

    /// Declare the identity attribute.
    pub fn identity(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::Identity])
    }

    /// Declare the natural key attribute.
    pub fn natural_key(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::NaturalKey])
    }

    /// Declare an attribute that must never be audited.
    pub fn excluded(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::Excluded])
    }

    pub fn created_by(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::CreatedBy])
    }

    pub fn created_at(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::CreatedAt])
    }

    pub fn last_modified_by(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::LastModifiedBy])
    }

    pub fn last_modified_at(self, name: impl Into<String>) -> Self {
        self.with_roles(name, [AttributeRole::LastModifiedAt])
    }

    /// Declare an attribute carrying any combination of roles.
    pub fn with_roles(
        mut self,
        name: impl Into<String>,
        roles: impl IntoIterator<Item = AttributeRole>,
    ) -> Self {
        self.schema.attributes.push(AttributeSpec {
            name: name.into(),
            roles: roles.into_iter().collect(),
        });
        self
    }

    /// Inherit the attributes of a parent type.
    pub fn extends(mut self, parent: EntitySchema) -> Self {
        self.schema.parent = Some(Box::new(parent));
        self
    }

    pub fn build(self) -> EntitySchema {
        self.schema
    }
}

/// Failure to read an attribute.
///
/// A readable attribute whose value is absent is `Ok(AuditValue::Null)`,
/// never one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// The object does not know the attribute.
    #[error("attribute '{0}' is not declared")]
    NotFound(String),

    /// The attribute exists but could not be read.
    #[error("attribute '{name}' could not be read: {reason}")]
    Access { name: String, reason: String },
}

impl AttributeError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn access(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Access {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A domain object whose mutations can be audited.
pub trait Auditable: Send + Sync {
    /// Fully-qualified type path; keys the metadata cache.
    fn type_path(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declarative description of the type. Only consulted the first time a
    /// type is seen.
    fn schema(&self) -> EntitySchema;

    /// Read one attribute by name.
    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError>;
}
