use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of bytes in a SHA-1 object id.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of the hex rendering of an [`ObjectId`].
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Content-addressed identifier for a git object.
///
/// An `ObjectId` is the SHA-1 of the object's canonical `"<kind> <size>\0"`
/// header followed by its payload. The storage layer never computes it: ids
/// are supplied by the protocol layer and trusted as given.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    /// The zero object id. Git uses it to mean "no object" in ref updates.
    pub const fn zero() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    /// Returns `true` if this is the zero object id.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation (40 lowercase chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 7 characters, as git prints them).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a 40-char hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Build from a raw byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != OBJECT_ID_LEN {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; OBJECT_ID_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

    #[test]
    fn zero_is_all_zeros() {
        let zero = ObjectId::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.to_hex(), "0".repeat(OBJECT_ID_HEX_LEN));
    }

    #[test]
    fn hex_parse_and_display() {
        let id = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert_eq!(id.to_string(), EMPTY_BLOB);
        assert_eq!(id.short_hex(), "e69de29");
        assert!(!id.is_zero());
    }

    #[test]
    fn from_str_matches_from_hex() {
        let parsed: ObjectId = EMPTY_BLOB.parse().unwrap();
        assert_eq!(parsed, ObjectId::from_hex(EMPTY_BLOB).unwrap());
    }

    #[test]
    fn rejects_bad_hex() {
        let err = ObjectId::from_hex("zz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
    }

    #[test]
    fn debug_is_short() {
        let id = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert_eq!(format!("{id:?}"), "ObjectId(e69de29)");
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_is_bytewise() {
        let a = ObjectId::from_hash([0; 20]);
        let b = ObjectId::from_hash([1; 20]);
        assert!(a < b);
    }
}
