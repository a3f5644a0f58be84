//! Collaborators that supply the persisted state of an entity.
//!
//! A repository-like object is a [`RepositoryContext`]. It may offer a
//! [`SnapshotSource`] itself or through one of its parent contexts; which
//! level does is discovered once per concrete context type and cached by the
//! [`TypeRegistry`](crate::registry::TypeRegistry).

use async_trait::async_trait;
use scribe_core::{AuditValue, ObjectRef};

/// "Find by identity" capability.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the persisted instance for `id`, or `None` when there is none.
    async fn find_by_id(&self, id: &AuditValue) -> anyhow::Result<Option<ObjectRef>>;
}

/// The object on whose behalf a mutation runs, usually a repository.
pub trait RepositoryContext: Send + Sync {
    /// Fully-qualified type path; keys the lookup cache.
    fn context_path(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Lookup capability offered directly by this context.
    fn snapshot_source(&self) -> Option<&dyn SnapshotSource> {
        None
    }

    /// The context this one delegates to, searched when it offers no lookup.
    fn parent_context(&self) -> Option<&dyn RepositoryContext> {
        None
    }
}

/// Cached result of searching a context chain for a lookup capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupAccessor {
    depth: usize,
}

impl LookupAccessor {
    pub(crate) fn at_depth(depth: usize) -> Self {
        Self { depth }
    }

    /// How many parent hops away from the context the capability lives.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Follow the cached path on a context of the type it was discovered on.
    pub fn resolve<'a>(&self, context: &'a dyn RepositoryContext) -> Option<&'a dyn SnapshotSource> {
        let mut current = context;
        for _ in 0..self.depth {
            current = current.parent_context()?;
        }
        current.snapshot_source()
    }
}
