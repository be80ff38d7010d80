use std::sync::Arc;

use keygit_kv::KvEngine;
use keygit_refs::DEFAULT_BRANCH;
use tracing::trace;

use crate::repository::Repository;

/// Hands out [`Repository`] handles over one shared engine.
///
/// Every handle it builds uses the same default branch. Loading never fails
/// and never touches storage; an unknown identifier is simply an empty
/// repository.
#[derive(Clone)]
pub struct RepositoryLoader {
    engine: Arc<dyn KvEngine>,
    default_branch: Arc<str>,
}

impl RepositoryLoader {
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self {
            engine,
            default_branch: Arc::from(DEFAULT_BRANCH),
        }
    }

    /// Use `branch` as the HEAD target of every loaded repository.
    pub fn with_default_branch(mut self, branch: impl Into<Arc<str>>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Build the handle for repository `id`.
    pub fn load(&self, id: &str) -> Repository {
        trace!(repo = id, "loading repository");
        Repository::open(
            Arc::clone(&self.engine),
            id,
            Arc::clone(&self.default_branch),
        )
    }
}

impl std::fmt::Debug for RepositoryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryLoader")
            .field("default_branch", &self.default_branch)
            .finish()
    }
}
