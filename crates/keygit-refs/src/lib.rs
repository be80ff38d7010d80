//! Reference management for keygit.
//!
//! References are the named entry points into a repository's object graph,
//! stored as loose entries in the repository's partition of the shared
//! key-value engine.
//!
//! # Architecture
//!
//! - **Direct refs** (`refs/heads/*`, `refs/tags/*`, ...) hold an object id,
//!   persisted as 40 hex characters.
//! - **Symbolic refs** name another ref and are persisted as
//!   `ref: <target>\n`.
//! - **HEAD** is never persisted. Every read synthesizes it as a symbolic ref
//!   to the store's default branch, and every write to it is rejected.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: The [`Reference`] value and its stored encoding
//! - [`traits`]: The [`RefStore`] trait defining the storage interface
//! - [`names`]: Ref name validation
//! - [`kv`]: [`KvRefStore`], the engine-backed implementation

pub mod error;
pub mod kv;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use kv::{KvRefStore, DEFAULT_BRANCH};
pub use names::validate_ref_name;
pub use traits::RefStore;
pub use types::{Reference, HEAD};
