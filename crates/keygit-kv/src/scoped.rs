use std::sync::Arc;

use crate::engine::{KvEngine, KvPair};
use crate::error::KvResult;
use crate::namespace::{format_key, strip_key};

/// A view of the shared engine restricted to one repository partition.
///
/// All keys passed in and returned are logical (namespace-free). Cloning is
/// cheap: the engine is shared behind an `Arc`.
#[derive(Clone)]
pub struct ScopedKv {
    repo: Arc<str>,
    engine: Arc<dyn KvEngine>,
}

impl ScopedKv {
    /// Bind `engine` to repository `repo`. Any string is accepted as an id.
    pub fn new(engine: Arc<dyn KvEngine>, repo: impl Into<Arc<str>>) -> Self {
        Self {
            repo: repo.into(),
            engine,
        }
    }

    /// The repository identifier this view is bound to.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// The shared engine behind this view.
    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    pub fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        self.engine.get(&format_key(&self.repo, key))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.engine.put(&format_key(&self.repo, key), value)
    }

    pub fn delete(&self, key: &[u8]) -> KvResult<bool> {
        self.engine.delete(&format_key(&self.repo, key))
    }

    pub fn contains(&self, key: &[u8]) -> KvResult<bool> {
        self.engine.contains(&format_key(&self.repo, key))
    }

    pub fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool> {
        self.engine
            .compare_and_swap(&format_key(&self.repo, key), expected, new)
    }

    /// All pairs under logical prefix `prefix`, keys stripped of the
    /// repository namespace.
    pub fn scan(&self, prefix: &[u8]) -> KvResult<Vec<KvPair>> {
        let pairs = self.engine.scan_prefix(&format_key(&self.repo, prefix))?;
        Ok(pairs
            .into_iter()
            .map(|p| KvPair::new(strip_key(&self.repo, &p.key).to_vec(), p.value))
            .collect())
    }
}

impl std::fmt::Debug for ScopedKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKv").field("repo", &self.repo).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;

    fn shared() -> Arc<MemoryEngine> {
        Arc::new(MemoryEngine::new())
    }

    #[test]
    fn writes_land_under_repo_prefix() {
        let engine = shared();
        let kv = ScopedKv::new(engine.clone(), "/owner/repo");
        kv.put(b"refs/heads/main", b"x").unwrap();
        assert_eq!(engine.keys(), vec![b"/owner/repo/refs/heads/main".to_vec()]);
    }

    #[test]
    fn scan_returns_logical_keys() {
        let kv = ScopedKv::new(shared(), "/o/r");
        kv.put(b"refs/heads/a", b"1").unwrap();
        kv.put(b"refs/tags/b", b"2").unwrap();
        kv.put(b"objects/c", b"3").unwrap();

        let keys: Vec<_> = kv.scan(b"refs/").unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec![b"refs/heads/a".to_vec(), b"refs/tags/b".to_vec()]);
    }

    #[test]
    fn partitions_are_isolated() {
        let engine = shared();
        let a = ScopedKv::new(engine.clone(), "/a");
        let ab = ScopedKv::new(engine.clone(), "/ab");

        a.put(b"refs/heads/main", b"from-a").unwrap();
        ab.put(b"refs/heads/main", b"from-ab").unwrap();

        assert_eq!(a.get(b"refs/heads/main").unwrap(), Some(b"from-a".to_vec()));
        assert_eq!(ab.get(b"refs/heads/main").unwrap(), Some(b"from-ab".to_vec()));
        assert_eq!(a.scan(b"refs/").unwrap().len(), 1);

        ab.delete(b"refs/heads/main").unwrap();
        assert!(a.contains(b"refs/heads/main").unwrap());
    }

    #[test]
    fn cas_is_scoped() {
        let engine = shared();
        let a = ScopedKv::new(engine.clone(), "/a");
        let b = ScopedKv::new(engine, "/b");
        assert!(a.compare_and_swap(b"k", None, Some(b"1")).unwrap());
        assert!(b.compare_and_swap(b"k", None, Some(b"1")).unwrap());
    }
}
