use keygit_types::{ObjectHasher, ObjectId, ObjectKind};

/// A stored git object: id + kind tag + payload + cached size.
///
/// The payload is the raw object body without git's `"<kind> <size>\0"`
/// header; the store never interprets it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Caller-supplied content id.
    pub id: ObjectId,
    /// The type of this object.
    pub kind: ObjectKind,
    /// The raw payload.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create an object with an id computed elsewhere.
    pub fn new(id: ObjectId, kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            id,
            kind,
            data,
            size,
        }
    }

    /// Create an object whose id is the git hash of `kind` and `data`.
    pub fn hashed(kind: ObjectKind, data: Vec<u8>) -> Self {
        let id = ObjectHasher::hash(kind, &data);
        Self::new(id, kind, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_tracks_payload() {
        let obj = StoredObject::new(ObjectId::zero(), ObjectKind::Blob, b"12345".to_vec());
        assert_eq!(obj.size, 5);
    }

    #[test]
    fn hashed_uses_git_id() {
        let obj = StoredObject::hashed(ObjectKind::Blob, Vec::new());
        assert_eq!(obj.id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        assert_eq!(obj.size, 0);
    }
}
