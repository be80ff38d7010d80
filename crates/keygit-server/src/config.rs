use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Which key-value engine backs every repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Persistent log under `data_dir`.
    #[default]
    Log,
    /// Process-lifetime only.
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub engine: EngineKind,
    /// fsync the log after every write.
    pub sync_writes: bool,
    /// Target of the synthesized HEAD.
    pub default_branch: String,
    /// Largest accepted request body, in bytes.
    pub max_pack_size: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 9000)),
            data_dir: PathBuf::from("tmp/db"),
            engine: EngineKind::Log,
            sync_writes: false,
            default_branch: "refs/heads/master".to_string(),
            max_pack_size: 100 * 1024 * 1024,
            shutdown_grace_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}
