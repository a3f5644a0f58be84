//! Actor resolution.
//!
//! The engine asks an [`ActorResolver`] who is performing the current
//! mutation. `None` (or a blank name) falls back to the configured system
//! actor.

use std::future::Future;

/// Resolves the actor of the current mutation.
pub trait ActorResolver: Send + Sync {
    fn current_actor(&self) -> Option<String>;
}

impl<F> ActorResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_actor(&self) -> Option<String> {
        self()
    }
}

/// Never knows an actor; every record is attributed to the system actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActor;

impl ActorResolver for NoActor {
    fn current_actor(&self) -> Option<String> {
        None
    }
}

/// Always resolves to the same actor (batch jobs, tests).
#[derive(Debug, Clone)]
pub struct FixedActor(pub String);

impl FixedActor {
    pub fn new(actor: impl Into<String>) -> Self {
        Self(actor.into())
    }
}

impl ActorResolver for FixedActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

tokio::task_local! {
    static CURRENT_ACTOR: String;
}

/// Resolves the actor bound to the running task with [`TaskActor::scope`].
///
/// ```rust,no_run
/// use scribe_audit::actor::{ActorResolver, TaskActor};
///
/// # async fn example() {
/// TaskActor::scope("alice", async {
///     assert_eq!(TaskActor.current_actor().as_deref(), Some("alice"));
/// })
/// .await;
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskActor;

impl TaskActor {
    /// Run `future` with `actor` as the current actor.
    pub async fn scope<F>(actor: impl Into<String>, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_ACTOR.scope(actor.into(), future).await
    }
}

impl ActorResolver for TaskActor {
    fn current_actor(&self) -> Option<String> {
        CURRENT_ACTOR.try_with(Clone::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_resolver() {
        let resolver = || Some("carol".to_string());
        assert_eq!(resolver.current_actor().as_deref(), Some("carol"));
    }

    #[test]
    fn test_fixed_and_none() {
        assert_eq!(FixedActor::new("dave").current_actor().as_deref(), Some("dave"));
        assert_eq!(NoActor.current_actor(), None);
    }

    #[tokio::test]
    async fn test_task_actor_scope() {
        assert_eq!(TaskActor.current_actor(), None);

        let inside = TaskActor::scope("erin", async { TaskActor.current_actor() }).await;
        assert_eq!(inside.as_deref(), Some("erin"));

        assert_eq!(TaskActor.current_actor(), None);
    }
}
