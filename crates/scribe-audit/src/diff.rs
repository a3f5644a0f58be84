//! Snapshot differ.
//!
//! Compares the before and after state of one object over the auditable
//! attributes of its type. Each side of an entry is a [`Slot`]: either the
//! side was never observed (no object on that side, or the read failed), or
//! a value was read. A read null is a real observation and is distinct from
//! an unobserved side.

use scribe_core::{AuditValue, Auditable};

use crate::registry::TypeMetadata;

/// One side of a field entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    /// Nothing was read for this side.
    #[default]
    Unobserved,
    /// The value read, with a null read kept as [`AuditValue::Null`].
    Observed(AuditValue),
}

impl Slot {
    pub fn value(&self) -> Option<&AuditValue> {
        match self {
            Self::Unobserved => None,
            Self::Observed(v) => Some(v),
        }
    }
}

/// Before and after state of a single attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldEntry {
    pub before: Slot,
    pub after: Slot,
}

impl FieldEntry {
    /// True when the two sides differ.
    ///
    /// An unobserved side compares equal to an observed null; it only
    /// differs from a present value.
    pub fn is_affected(&self) -> bool {
        match (&self.before, &self.after) {
            (Slot::Unobserved, Slot::Unobserved) => false,
            (Slot::Observed(before), Slot::Observed(after)) => before != after,
            (Slot::Unobserved, Slot::Observed(value))
            | (Slot::Observed(value), Slot::Unobserved) => !value.is_null(),
        }
    }
}

/// A changed attribute with both sides, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedField {
    pub field_name: String,
    pub before: Slot,
    pub after: Slot,
}

/// Per-attribute before/after state of one mutation, in attribute order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDiff {
    entries: Vec<(String, FieldEntry)>,
}

impl FieldDiff {
    /// An empty diff with one unobserved entry per tracked attribute.
    pub fn for_metadata(metadata: &TypeMetadata) -> Self {
        Self {
            entries: metadata
                .auditable_attributes()
                .iter()
                .map(|a| (a.name().to_string(), FieldEntry::default()))
                .collect(),
        }
    }

    fn entry_mut(&mut self, name: &str) -> &mut FieldEntry {
        let position = match self.entries.iter().position(|(n, _)| n == name) {
            Some(position) => position,
            None => {
                self.entries.push((name.to_string(), FieldEntry::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    pub fn put_before(&mut self, name: &str, value: AuditValue) {
        self.entry_mut(name).before = Slot::Observed(value);
    }

    pub fn put_after(&mut self, name: &str, value: AuditValue) {
        self.entry_mut(name).after = Slot::Observed(value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Number of tracked attributes, changed or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tracked attributes in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Whether `name` is tracked and changed. Untracked names are unchanged.
    pub fn is_affected(&self, name: &str) -> bool {
        self.get(name).is_some_and(FieldEntry::is_affected)
    }

    /// Names of the changed attributes, in order.
    pub fn affected_names(&self) -> Vec<&str> {
        self.entries()
            .filter(|(_, e)| e.is_affected())
            .map(|(n, _)| n)
            .collect()
    }

    /// The changed attributes, in order.
    pub fn affected(&self) -> Vec<AffectedField> {
        self.entries()
            .filter(|(_, e)| e.is_affected())
            .map(|(n, e)| AffectedField {
                field_name: n.to_string(),
                before: e.before.clone(),
                after: e.after.clone(),
            })
            .collect()
    }
}

/// Diff `before` against `after` over the auditable attributes in `metadata`.
///
/// All before-values are read first, then all after-values. An attribute
/// whose read fails is logged and left unobserved on that side.
pub fn diff(
    before: Option<&dyn Auditable>,
    after: Option<&dyn Auditable>,
    metadata: &TypeMetadata,
) -> FieldDiff {
    let mut field_diff = FieldDiff::for_metadata(metadata);

    if let Some(before) = before {
        for attribute in metadata.auditable_attributes() {
            match attribute.read(before) {
                Ok(value) => field_diff.put_before(attribute.name(), value),
                Err(e) => tracing::warn!(
                    type_path = metadata.type_path(),
                    attribute = attribute.name(),
                    side = "before",
                    error = %e,
                    "Failed to read attribute for diff"
                ),
            }
        }
    }

    if let Some(after) = after {
        for attribute in metadata.auditable_attributes() {
            match attribute.read(after) {
                Ok(value) => field_diff.put_after(attribute.name(), value),
                Err(e) => tracing::warn!(
                    type_path = metadata.type_path(),
                    attribute = attribute.name(),
                    side = "after",
                    error = %e,
                    "Failed to read attribute for diff"
                ),
            }
        }
    }

    field_diff
}
