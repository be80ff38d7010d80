//! Repository handles for keygit.
//!
//! A [`Repository`] binds one repository identifier to an object store and a
//! reference store over the shared engine. It holds nothing but the
//! identifier, the default branch, and an `Arc` to the engine, so it is cheap
//! to build per request. [`RepositoryLoader`] builds handles from a shared
//! engine and the server-wide default branch.

pub mod loader;
pub mod repository;

pub use loader::RepositoryLoader;
pub use repository::Repository;
