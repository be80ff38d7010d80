use std::fmt;
use std::sync::Arc;

use keygit_kv::{KvEngine, LogEngine, LogEngineConfig, MemoryEngine, SyncMode, SEPARATOR};
use keygit_repo::{Repository, RepositoryLoader};
use tracing::info;

use crate::config::{EngineKind, ServerConfig};
use crate::error::{ServerError, ServerResult};

/// Everything a request handler needs, built once at startup and cloned
/// into the router state.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<ServerConfig>,
    engine: Arc<dyn KvEngine>,
    loader: RepositoryLoader,
}

impl AppContext {
    /// Wrap an already opened engine.
    pub fn new(config: ServerConfig, engine: Arc<dyn KvEngine>) -> Self {
        let loader = RepositoryLoader::new(Arc::clone(&engine))
            .with_default_branch(config.default_branch.as_str());
        Self {
            config: Arc::new(config),
            engine,
            loader,
        }
    }

    /// Open the engine `config` selects.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let engine = open_engine(&config)?;
        Ok(Self::new(config, engine))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    /// Repository handle for `/{owner}/{repo}`.
    ///
    /// Either segment containing the key separator would alias another
    /// repository's partition, so such paths are not found.
    pub fn repository(&self, owner: &str, repo: &str) -> ServerResult<Repository> {
        if !is_segment(owner) || !is_segment(repo) {
            return Err(ServerError::NotFound);
        }
        Ok(self.loader.load(&format!("/{owner}/{repo}")))
    }
}

fn is_segment(name: &str) -> bool {
    !name.is_empty() && !name.as_bytes().contains(&SEPARATOR)
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

pub fn open_engine(config: &ServerConfig) -> ServerResult<Arc<dyn KvEngine>> {
    match config.engine {
        EngineKind::Memory => {
            info!("using in-memory engine");
            Ok(Arc::new(MemoryEngine::new()))
        }
        EngineKind::Log => {
            let sync_mode = if config.sync_writes {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            };
            let engine = LogEngine::open(
                &config.data_dir,
                LogEngineConfig {
                    sync_mode,
                    ..LogEngineConfig::default()
                },
            )?;
            Ok(Arc::new(engine))
        }
    }
}
