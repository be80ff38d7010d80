use keygit_refs::RefError;
use keygit_store::StoreError;
use keygit_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("framing error: {0}")]
    Framing(String),

    #[error("pkt-line payload too large: {size} bytes (max {max})")]
    LineTooLarge { size: usize, max: usize },

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid pack signature")]
    InvalidPackSignature,

    #[error("unsupported pack version: {0}")]
    UnsupportedPackVersion(u32),

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptPack { offset: u64, reason: String },

    #[error("pack checksum mismatch")]
    ChecksumMismatch,

    #[error("delta base not found: {0}")]
    DeltaBaseNotFound(ObjectId),

    #[error("invalid delta: {0}")]
    InvalidDelta(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("object {id} is not a valid {kind}: {reason}")]
    MalformedObject {
        id: ObjectId,
        kind: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
