//! Error types for reference operations.

use keygit_kv::KvError;
use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The stored bytes are neither a symbolic nor a direct reference.
    #[error("cannot decode ref {name}: {reason}")]
    Decode { name: String, reason: String },

    /// The stored value did not match the expected old value.
    #[error("ref changed concurrently: {name}")]
    Conflict { name: String },

    /// The operation is not supported by this store.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// HEAD is synthesized on read and cannot be written.
    #[error("HEAD is synthesized and cannot be modified")]
    SynthesizedHead,

    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Failure in the underlying key-value engine.
    #[error(transparent)]
    Engine(#[from] KvError),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
