use keygit_kv::KvError;
use keygit_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No payload is stored under the requested id.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Stored bytes could not be decoded into a typed object.
    #[error("cannot decode object at {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Any other failure of the underlying engine, passed through unchanged.
    #[error(transparent)]
    Engine(#[from] KvError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
