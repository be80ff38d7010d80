use sha1::{Digest, Sha1};

use crate::kind::ObjectKind;
use crate::object::ObjectId;

/// Git object hasher.
///
/// Computes `SHA-1("<kind> <len>\0" || payload)`, the id git assigns to a
/// loose object. Only the protocol layer uses this; the stores accept ids
/// as supplied.
pub struct ObjectHasher;

impl ObjectHasher {
    /// Hash a typed payload into its git object id.
    pub fn hash(kind: ObjectKind, data: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(data.len().to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(data);
        ObjectId::from_hash(hasher.finalize().into())
    }

    /// Verify that a payload hashes to the expected id.
    pub fn verify(kind: ObjectKind, data: &[u8], expected: &ObjectId) -> bool {
        Self::hash(kind, data) == *expected
    }

    /// Raw SHA-1 of arbitrary bytes (pack trailers).
    pub fn raw(data: &[u8]) -> [u8; 20] {
        Sha1::digest(data).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_matches_git() {
        let id = ObjectHasher::hash(ObjectKind::Blob, b"");
        assert_eq!(id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn hello_blob_matches_git() {
        // `printf 'hello\n' | git hash-object --stdin`
        let id = ObjectHasher::hash(ObjectKind::Blob, b"hello\n");
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn empty_tree_matches_git() {
        let id = ObjectHasher::hash(ObjectKind::Tree, b"");
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn kind_changes_the_id() {
        let blob = ObjectHasher::hash(ObjectKind::Blob, b"same");
        let tag = ObjectHasher::hash(ObjectKind::Tag, b"same");
        assert_ne!(blob, tag);
    }

    #[test]
    fn verify_accepts_matching_payload() {
        let id = ObjectHasher::hash(ObjectKind::Blob, b"payload");
        assert!(ObjectHasher::verify(ObjectKind::Blob, b"payload", &id));
        assert!(!ObjectHasher::verify(ObjectKind::Blob, b"other", &id));
    }
}
