//! The [`RefStore`] trait defining the reference storage interface.

use keygit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::Reference;

/// Maximum symbolic hops followed by [`RefStore::resolve`].
pub const MAX_SYMBOLIC_DEPTH: usize = 5;

/// Storage backend for the references of one repository.
///
/// Together with the object store this forms the storage-provider contract
/// the protocol sessions run against. Implementations must be `Send + Sync`.
pub trait RefStore: Send + Sync {
    /// Create or overwrite a ref (last writer wins).
    fn set(&self, reference: &Reference) -> Result<()>;

    /// Store `new` only if the currently stored ref under the same name
    /// equals `old`.
    ///
    /// `old = None` skips the check and behaves like [`RefStore::set`].
    /// Fails with [`RefError::Conflict`] on mismatch, including when the
    /// value changed between the comparison and the write.
    fn compare_and_set(&self, new: &Reference, old: Option<&Reference>) -> Result<()>;

    /// Read a ref by full name. `HEAD` is always answered without storage.
    fn get(&self, name: &str) -> Result<Reference>;

    /// Every persisted ref under `refs/`, in name order. HEAD is not included.
    fn iter_all(&self) -> Result<Vec<Reference>>;

    /// Delete a ref. Removing an absent ref is not an error.
    fn remove(&self, name: &str) -> Result<()>;

    /// Number of loose refs; equal to `iter_all().len()`.
    fn count_loose(&self) -> Result<usize> {
        Ok(self.iter_all()?.len())
    }

    /// Compact loose refs into a packed form. Not supported.
    fn pack_refs(&self) -> Result<()> {
        Err(RefError::NotImplemented("pack_refs"))
    }

    /// Follow symbolic refs from `name` until a direct ref is reached.
    fn resolve(&self, name: &str) -> Result<ObjectId> {
        let mut current = self.get(name)?;
        for _ in 0..MAX_SYMBOLIC_DEPTH {
            match current {
                Reference::Direct { target, .. } => return Ok(target),
                Reference::Symbolic { target, .. } => current = self.get(&target)?,
            }
        }
        current.object_id().ok_or_else(|| RefError::Decode {
            name: name.to_string(),
            reason: format!("symbolic ref chain deeper than {MAX_SYMBOLIC_DEPTH}"),
        })
    }
}
