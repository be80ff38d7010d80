use std::sync::Arc;

use keygit_kv::{KvEngine, ScopedKv};
use keygit_refs::{RefStore, Reference};
use keygit_store::{KvObjectStore, ObjectStore, StoreResult, StoredObject};
use keygit_types::{ObjectId, ObjectKind};

/// One repository's view of the shared engine.
///
/// Implements both halves of the storage-provider contract by delegating to
/// a [`KvObjectStore`] and a [`KvRefStore`](keygit_refs::KvRefStore) bound to
/// the same partition.
#[derive(Clone, Debug)]
pub struct Repository {
    id: Arc<str>,
    objects: KvObjectStore,
    refs: keygit_refs::KvRefStore,
}

impl Repository {
    /// Bind `engine` to the partition named by `id` (e.g. `/owner/repo`).
    pub fn open(
        engine: Arc<dyn KvEngine>,
        id: impl Into<Arc<str>>,
        default_branch: impl Into<Arc<str>>,
    ) -> Self {
        let id = id.into();
        let kv = ScopedKv::new(engine, Arc::clone(&id));
        Self {
            objects: KvObjectStore::new(kv.clone()),
            refs: keygit_refs::KvRefStore::new(kv, default_branch),
            id,
        }
    }

    /// The repository identifier this handle is bound to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The branch HEAD points at.
    pub fn default_branch(&self) -> &str {
        self.refs.default_branch()
    }

    pub fn objects(&self) -> &KvObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &keygit_refs::KvRefStore {
        &self.refs
    }
}

impl ObjectStore for Repository {
    fn put(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.objects.put(object)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.objects.get(id)
    }

    fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        self.objects.has(id)
    }

    fn iter_kind(&self, kind: ObjectKind) -> StoreResult<Vec<StoredObject>> {
        self.objects.iter_kind(kind)
    }
}

impl RefStore for Repository {
    fn set(&self, reference: &Reference) -> keygit_refs::Result<()> {
        self.refs.set(reference)
    }

    fn compare_and_set(
        &self,
        new: &Reference,
        old: Option<&Reference>,
    ) -> keygit_refs::Result<()> {
        self.refs.compare_and_set(new, old)
    }

    fn get(&self, name: &str) -> keygit_refs::Result<Reference> {
        self.refs.get(name)
    }

    fn iter_all(&self) -> keygit_refs::Result<Vec<Reference>> {
        self.refs.iter_all()
    }

    fn remove(&self, name: &str) -> keygit_refs::Result<()> {
        self.refs.remove(name)
    }

    fn count_loose(&self) -> keygit_refs::Result<usize> {
        self.refs.count_loose()
    }

    fn pack_refs(&self) -> keygit_refs::Result<()> {
        self.refs.pack_refs()
    }
}
