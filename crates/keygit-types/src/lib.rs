//! Foundation types for keygit.
//!
//! Every other keygit crate depends on `keygit-types`. It defines how git
//! objects are identified and classified, independent of where they are
//! stored.
//!
//! # Key Types
//!
//! - [`ObjectId`]: 20-byte SHA-1 content identifier, rendered as 40 hex chars
//! - [`ObjectKind`]: the closed set of git object kinds (commit, tree, blob, tag)
//! - [`ObjectHasher`]: computes the git object id of a typed payload

pub mod error;
pub mod hash;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use hash::ObjectHasher;
pub use kind::ObjectKind;
pub use object::{ObjectId, OBJECT_ID_HEX_LEN, OBJECT_ID_LEN};
