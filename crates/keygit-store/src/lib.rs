//! Content-addressed git object storage for keygit.
//!
//! Objects live inside a repository's partition of the shared key-value
//! engine. Each object occupies two logical keys:
//!
//! ```text
//! objects/<hex-id>        -> raw payload bytes
//! objects/<hex-id>/type   -> "commit" | "tree" | "blob" | "tag"
//! ```
//!
//! # Design Rules
//!
//! 1. Ids are supplied by the caller and trusted; the store never rehashes.
//! 2. Writing an id again overwrites silently (idempotent by id).
//! 3. Objects are never deleted.
//! 4. `put` writes the type tag first, then the payload. The pair is not
//!    atomic; a reader may observe a tag without a payload, which reads as
//!    not-found.
//! 5. Enumeration reads the whole `objects/` partition into memory.

pub mod error;
pub mod kv;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use kv::KvObjectStore;
pub use object::StoredObject;
pub use traits::ObjectStore;
