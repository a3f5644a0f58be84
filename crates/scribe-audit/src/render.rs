//! Bounded value serializer.
//!
//! Renders audited values into JSON for storage. Sequences and nested
//! objects increase the depth by one for their children; a composite whose
//! children would land deeper than [`MAX_DEPTH`] is replaced by
//! [`OMITTED_MARKER`]. This bounds record size and stops traversal of
//! cyclic object graphs.
//!
//! Depth is a plain argument of the recursion, so concurrent renders share
//! no state.

use scribe_core::{AuditNumber, AuditValue, Auditable};
use serde_json::{Map, Number, Value};

use crate::diff::{AffectedField, Slot};
use crate::error::AuditError;
use crate::record::FieldChange;
use crate::registry::TypeRegistry;

/// Deepest level at which children of a composite are still rendered.
pub const MAX_DEPTH: usize = 2;

/// Stands in for a composite that was cut off at [`MAX_DEPTH`].
pub const OMITTED_MARKER: &str = "<max depth>";

/// Stored form of a top-level side that was read as null.
pub const NULL_MARKER: &str = "NULL";

/// Renders values, walking nested objects through the metadata cache.
#[derive(Debug, Clone, Copy)]
pub struct BoundedRenderer<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> BoundedRenderer<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Render a value from depth 0.
    ///
    /// Fails only when a nested object's type is misconfigured.
    pub fn render(&self, value: &AuditValue) -> Result<Value, AuditError> {
        self.render_at(value, 0)
    }

    /// Render one side of a diff entry.
    ///
    /// An unobserved side is JSON `null`; a side read as null is
    /// [`NULL_MARKER`], keeping "became null" apart from "never seen".
    pub fn render_slot(&self, slot: &Slot) -> Result<Value, AuditError> {
        match slot {
            Slot::Unobserved => Ok(Value::Null),
            Slot::Observed(AuditValue::Null) => Ok(Value::String(NULL_MARKER.to_string())),
            Slot::Observed(value) => self.render(value),
        }
    }

    /// Render a changed attribute into its stored triple.
    pub fn render_field(&self, field: &AffectedField) -> Result<FieldChange, AuditError> {
        Ok(FieldChange {
            field_name: field.field_name.clone(),
            before: self.render_slot(&field.before)?,
            after: self.render_slot(&field.after)?,
        })
    }

    fn render_at(&self, value: &AuditValue, depth: usize) -> Result<Value, AuditError> {
        match value {
            AuditValue::Null => Ok(Value::Null),
            AuditValue::Bool(b) => Ok(Value::Bool(*b)),
            AuditValue::Number(n) => Ok(render_number(n)),
            AuditValue::Text(s) => Ok(Value::String(s.clone())),
            AuditValue::Sequence(items) => {
                if depth >= MAX_DEPTH {
                    return Ok(omitted());
                }
                items
                    .iter()
                    .map(|item| self.render_at(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            AuditValue::Object(object) => {
                if depth >= MAX_DEPTH {
                    return Ok(omitted());
                }
                self.render_object(object.as_auditable(), depth)
            }
        }
    }

    fn render_object(&self, object: &dyn Auditable, depth: usize) -> Result<Value, AuditError> {
        let metadata = self.registry.describe(object)?;
        let mut map = Map::new();

        for attribute in metadata.auditable_attributes() {
            match attribute.read(object) {
                Ok(value) => {
                    map.insert(
                        attribute.name().to_string(),
                        self.render_at(&value, depth + 1)?,
                    );
                }
                Err(e) => tracing::warn!(
                    type_path = metadata.type_path(),
                    attribute = attribute.name(),
                    error = %e,
                    "Skipping unreadable attribute while rendering"
                ),
            }
        }

        Ok(Value::Object(map))
    }
}

fn omitted() -> Value {
    Value::String(OMITTED_MARKER.to_string())
}

/// Keep each numeric subtype's own representation.
fn render_number(number: &AuditNumber) -> Value {
    match number {
        AuditNumber::Int(n) => Value::from(*n),
        AuditNumber::UInt(n) => Value::from(*n),
        AuditNumber::Float(n) => Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string())),
        AuditNumber::BigInt(n) => exact_number(n.to_string()),
        AuditNumber::Decimal(n) => exact_number(n.to_string()),
    }
}

/// Parse digits as a JSON number without going through `f64`.
fn exact_number(text: String) -> Value {
    match serde_json::from_str::<Number>(&text) {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(text),
    }
}
