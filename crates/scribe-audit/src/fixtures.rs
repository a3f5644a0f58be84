//! Audited types shared by the unit tests.

use scribe_core::{AttributeError, AuditValue, Auditable, EntitySchema, ObjectRef};
use std::sync::Arc;

fn base_entity() -> EntitySchema {
    EntitySchema::builder("BaseEntity")
        .identity("id")
        .attribute("version")
        .created_by("created_by")
        .created_at("created_at")
        .last_modified_by("last_modified_by")
        .last_modified_at("last_modified_at")
        .build()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Address {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.to_string(),
            city: city.to_string(),
        }
    }
}

impl Auditable for Address {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Address")
            .attribute("street")
            .attribute("city")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "street" => Ok(self.street.clone().into()),
            "city" => Ok(self.city.clone().into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub deleted: bool,
    pub address: Option<Address>,
    pub tags: Vec<String>,
    pub version: i64,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub last_modified_by: Option<String>,
    pub last_modified_at: Option<String>,
}

impl Customer {
    pub fn sample() -> Self {
        Self {
            id: Some(7),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
            deleted: false,
            address: Some(Address::new("Main St 1", "Athens")),
            tags: vec!["early-adopter".to_string()],
            version: 1,
            created_by: Some("seed".to_string()),
            created_at: Some("2024-01-01T00:00:00Z".to_string()),
            last_modified_by: None,
            last_modified_at: None,
        }
    }
}

impl Auditable for Customer {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Customer")
            .attribute("name")
            .natural_key("email")
            .excluded("password")
            .attribute("deleted")
            .attribute("address")
            .attribute("tags")
            .extends(base_entity())
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        Ok(match name {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "email" => self.email.clone().into(),
            "password" => self.password.clone().into(),
            "deleted" => self.deleted.into(),
            "address" => self.address.clone().map(ObjectRef::new).into(),
            "tags" => self.tags.clone().into(),
            "version" => self.version.into(),
            "created_by" => self.created_by.clone().into(),
            "created_at" => self.created_at.clone().into(),
            "last_modified_by" => self.last_modified_by.clone().into(),
            "last_modified_at" => self.last_modified_at.clone().into(),
            other => return Err(AttributeError::not_found(other)),
        })
    }
}

/// Self-nesting type for depth tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub child: Option<Arc<Node>>,
}

impl Node {
    /// `labels[0]` holding `labels[1]` holding ... down to the last label.
    pub fn chain(labels: &[&str]) -> Self {
        let (first, rest) = labels.split_first().expect("at least one label");
        Self {
            label: first.to_string(),
            child: (!rest.is_empty()).then(|| Arc::new(Self::chain(rest))),
        }
    }
}

impl Auditable for Node {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Node")
            .attribute("label")
            .attribute("child")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "label" => Ok(self.label.clone().into()),
            "child" => Ok(self.child.clone().map(ObjectRef::from_arc).into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

/// One attribute always fails to read.
#[derive(Debug, Clone, PartialEq)]
pub struct Faulty {
    pub id: i64,
    pub label: String,
}

impl Faulty {
    pub fn new(label: &str) -> Self {
        Self {
            id: 1,
            label: label.to_string(),
        }
    }
}

impl Auditable for Faulty {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("Faulty")
            .identity("id")
            .attribute("label")
            .attribute("broken")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "id" => Ok(self.id.into()),
            "label" => Ok(self.label.clone().into()),
            "broken" => Err(AttributeError::access("broken", "lazy association not loaded")),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoIdentities;

impl Auditable for TwoIdentities {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("TwoIdentities")
            .identity("id")
            .identity("legacy_id")
            .build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "id" | "legacy_id" => Ok(1i64.into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoIdentity {
    pub note: String,
}

impl Auditable for NoIdentity {
    fn schema(&self) -> EntitySchema {
        EntitySchema::builder("NoIdentity").attribute("note").build()
    }

    fn attribute(&self, name: &str) -> Result<AuditValue, AttributeError> {
        match name {
            "note" => Ok(self.note.clone().into()),
            other => Err(AttributeError::not_found(other)),
        }
    }
}
