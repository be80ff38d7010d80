//! The reference value and its stored encoding.

use serde::{Deserialize, Serialize};

use keygit_types::ObjectId;

use crate::error::{RefError, Result};

/// Name of the synthesized symbolic ref.
pub const HEAD: &str = "HEAD";

const SYMBOLIC_PREFIX: &str = "ref: ";

/// A named pointer into the object graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    /// Points straight at an object.
    Direct {
        /// Full ref name (e.g. "refs/heads/main").
        name: String,
        /// The object this ref points at.
        target: ObjectId,
    },

    /// Aliases another ref by name.
    Symbolic {
        /// Full ref name (e.g. "HEAD").
        name: String,
        /// Full name of the aliased ref.
        target: String,
    },
}

impl Reference {
    pub fn direct(name: impl Into<String>, target: ObjectId) -> Self {
        Reference::Direct {
            name: name.into(),
            target,
        }
    }

    pub fn symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Reference::Symbolic {
            name: name.into(),
            target: target.into(),
        }
    }

    /// The full name of this ref.
    pub fn name(&self) -> &str {
        match self {
            Reference::Direct { name, .. } | Reference::Symbolic { name, .. } => name,
        }
    }

    /// Returns `true` if this ref aliases another ref.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Reference::Symbolic { .. })
    }

    /// The object id, for direct refs.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Reference::Direct { target, .. } => Some(*target),
            Reference::Symbolic { .. } => None,
        }
    }

    /// The aliased ref name, for symbolic refs.
    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            Reference::Symbolic { target, .. } => Some(target),
            Reference::Direct { .. } => None,
        }
    }

    /// Stored form: `ref: <target>\n` for symbolic refs, bare hex for direct ones.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reference::Direct { target, .. } => target.to_hex().into_bytes(),
            Reference::Symbolic { target, .. } => {
                format!("{SYMBOLIC_PREFIX}{target}\n").into_bytes()
            }
        }
    }

    /// Decode the stored value of ref `name`. Surrounding whitespace is ignored.
    pub fn decode(name: &str, raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| RefError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_strings(name, text)
    }

    /// Build a ref from its name and textual value.
    pub fn from_strings(name: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(target) = value.strip_prefix(SYMBOLIC_PREFIX) {
            let target = target.trim();
            if target.is_empty() {
                return Err(RefError::Decode {
                    name: name.to_string(),
                    reason: "empty symbolic target".into(),
                });
            }
            return Ok(Reference::symbolic(name, target));
        }

        let target = ObjectId::from_hex(value).map_err(|e| RefError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Reference::direct(name, target))
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Direct { name, target } => write!(f, "{target} {name}"),
            Reference::Symbolic { name, target } => write!(f, "ref: {target} {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 20])
    }

    #[test]
    fn direct_encodes_as_bare_hex() {
        let r = Reference::direct("refs/heads/main", id(0xab));
        assert_eq!(r.encode(), "ab".repeat(20).into_bytes());
    }

    #[test]
    fn symbolic_encodes_with_prefix_and_newline() {
        let r = Reference::symbolic("refs/remotes/origin/HEAD", "refs/heads/main");
        assert_eq!(r.encode(), b"ref: refs/heads/main\n");
    }

    #[test]
    fn decode_direct_tolerates_trailing_newline() {
        let raw = format!("{}\n", id(1).to_hex());
        let r = Reference::decode("refs/tags/v1", raw.as_bytes()).unwrap();
        assert_eq!(r, Reference::direct("refs/tags/v1", id(1)));
    }

    #[test]
    fn decode_symbolic() {
        let r = Reference::decode("refs/heads/alias", b"ref: refs/heads/main\n").unwrap();
        assert_eq!(r.symbolic_target(), Some("refs/heads/main"));
        assert_eq!(r.object_id(), None);
        assert!(r.is_symbolic());
    }

    #[test]
    fn encode_decode_preserves_target() {
        for r in [
            Reference::direct("refs/heads/main", id(9)),
            Reference::symbolic("refs/heads/alias", "refs/heads/main"),
        ] {
            assert_eq!(Reference::decode(r.name(), &r.encode()).unwrap(), r);
        }
    }

    #[test]
    fn garbage_is_decode_error() {
        let cases: [&[u8]; 4] = [b"not-a-hash", b"", b"ref: ", &[0xff, 0xfe]];
        for raw in cases {
            let err = Reference::decode("refs/heads/x", raw).unwrap_err();
            assert!(matches!(err, RefError::Decode { .. }), "{raw:?}");
        }
    }

    #[test]
    fn display_is_human_readable() {
        let r = Reference::direct("refs/heads/main", id(0));
        assert_eq!(r.to_string(), format!("{} refs/heads/main", "0".repeat(40)));
    }
}
