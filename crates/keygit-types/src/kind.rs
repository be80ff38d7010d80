use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a git object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A snapshot of a tree plus history metadata.
    Commit,
    /// Directory listing mapping names to object ids.
    Tree,
    /// Raw file content.
    Blob,
    /// Annotated tag pointing at another object.
    Tag,
}

impl ObjectKind {
    /// All kinds, in pack type-number order.
    pub const ALL: [ObjectKind; 4] = [Self::Commit, Self::Tree, Self::Blob, Self::Tag];

    /// The canonical lowercase name used in object headers and stored type tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in ObjectKind::ALL {
            assert_eq!(kind.as_str().parse::<ObjectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
        assert_eq!(ObjectKind::Tag.to_string(), "tag");
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = "ofs-delta".parse::<ObjectKind>().unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("ofs-delta".into()));
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Blob".parse::<ObjectKind>().is_err());
    }
}
