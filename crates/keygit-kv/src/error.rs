use std::path::PathBuf;

/// Errors produced by key-value engines.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// I/O error from the on-disk log.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A log record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The log file is unusable (not a log, or unreadable header).
    #[error("corrupt log at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Another engine already holds the data directory.
    #[error("data directory is locked by another process: {path}")]
    Locked { path: PathBuf },

    /// An internal lock was poisoned by a panicking writer.
    #[error("engine lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the engine crate.
pub type KvResult<T> = Result<T, KvError>;
