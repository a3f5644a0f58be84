//! Mutation classifier.
//!
//! Decides which audit action a save represents. Deletes never come
//! through here: they are classified as [`AuditAction::Delete`] by the
//! caller without a diff.

use scribe_core::AuditValue;

use crate::diff::{AffectedField, FieldDiff, Slot};
use crate::record::AuditAction;

/// Outcome of classifying a save.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// No prior state and the saved object has an identity.
    Insert,
    /// Only the soft-delete flag changed, to true.
    SoftDelete,
    /// Only the soft-delete flag changed, to false.
    SoftRestore,
    /// One or more attributes changed; carries only those.
    Update(Vec<AffectedField>),
    /// Nothing changed. No record is produced.
    Unchanged,
}

impl Classification {
    /// The action to record, or `None` for [`Classification::Unchanged`].
    pub fn action(&self) -> Option<AuditAction> {
        match self {
            Self::Insert => Some(AuditAction::Insert),
            Self::SoftDelete => Some(AuditAction::SoftDelete),
            Self::SoftRestore => Some(AuditAction::SoftRestore),
            Self::Update(_) => Some(AuditAction::Update),
            Self::Unchanged => None,
        }
    }
}

/// Classify a save.
///
/// `diff` is only evaluated when the save is not an insert.
pub fn classify<F>(
    before_present: bool,
    after_has_identity: bool,
    diff: F,
    soft_delete_field: &str,
) -> Classification
where
    F: FnOnce() -> FieldDiff,
{
    if !before_present && after_has_identity {
        return Classification::Insert;
    }
    classify_diff(&diff(), soft_delete_field)
}

/// Classify a computed diff.
///
/// The soft-delete path requires the flag to be the *only* affected
/// attribute and its new value to be a boolean; anything else is an update.
pub fn classify_diff(diff: &FieldDiff, soft_delete_field: &str) -> Classification {
    let affected = diff.affected();

    if let [only] = affected.as_slice() {
        if only.field_name == soft_delete_field {
            match only.after {
                Slot::Observed(AuditValue::Bool(true)) => return Classification::SoftDelete,
                Slot::Observed(AuditValue::Bool(false)) => return Classification::SoftRestore,
                _ => {}
            }
        }
    }

    if affected.is_empty() {
        Classification::Unchanged
    } else {
        Classification::Update(affected)
    }
}
