use keygit_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// Content-addressed storage of typed git objects for one repository.
///
/// This is half of the storage-provider contract the protocol sessions are
/// written against; the other half is the reference store.
pub trait ObjectStore: Send + Sync {
    /// Store an object under its (caller-supplied) id and return the id.
    fn put(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Read an object by id.
    ///
    /// Fails with [`StoreError::NotFound`] if no payload exists and
    /// [`StoreError::Decode`] if the stored type tag is unrecognized.
    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject>;

    /// Whether a payload exists for `id`.
    fn has(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Every object of the given kind, fully materialized, in no particular order.
    fn iter_kind(&self, kind: ObjectKind) -> StoreResult<Vec<StoredObject>>;

    /// Read an object and require it to be of `kind`.
    fn get_as(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<StoredObject> {
        let object = self.get(id)?;
        if object.kind != kind {
            return Err(StoreError::Decode {
                key: id.to_hex(),
                reason: format!("expected {kind}, found {}", object.kind),
            });
        }
        Ok(object)
    }

    /// Store several objects, stopping at the first failure.
    fn put_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.put(obj)).collect()
    }
}
