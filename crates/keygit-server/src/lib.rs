//! Smart-HTTP git server for keygit.
//!
//! Serves many repositories out of one shared key-value engine. A
//! repository is addressed as `/{owner}/{repo}` and exists implicitly: an
//! unknown path is an empty repository that a first push populates.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{EngineKind, ServerConfig};
pub use context::AppContext;
pub use error::{ServerError, ServerResult};
pub use server::KeygitServer;
