//! Key-value persistence for keygit.
//!
//! Every repository served by one process shares a single ordered
//! byte-string store. This crate provides that store and the discipline that
//! keeps repositories apart inside it.
//!
//! # Engines
//!
//! All engines implement the [`KvEngine`] trait:
//!
//! - [`MemoryEngine`]: `BTreeMap` behind a `RwLock`, for tests and ephemeral servers
//! - [`LogEngine`]: CRC-framed append-only log replayed into memory on open
//!
//! # Namespacing
//!
//! A repository identifier such as `/owner/repo` is used verbatim as a key
//! prefix: logical key `refs/heads/main` becomes physical key
//! `/owner/repo/refs/heads/main`. [`format_key`] and [`strip_key`] are the
//! pure codec; [`ScopedKv`] binds an engine to one repository and speaks
//! logical keys only.

pub mod engine;
pub mod error;
pub mod log;
pub mod memory;
pub mod namespace;
pub mod scoped;

pub use engine::{KvEngine, KvPair};
pub use error::{KvError, KvResult};
pub use log::{LogEngine, LogEngineConfig, SyncMode};
pub use memory::MemoryEngine;
pub use namespace::{format_key, strip_key, SEPARATOR};
pub use scoped::ScopedKv;
