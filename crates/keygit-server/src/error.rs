use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The URL names a `git-` service that does not exist.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The request does not address a git endpoint.
    #[error("not found")]
    NotFound,

    /// The request body exceeds `max_pack_size` once inflated.
    #[error("request body larger than {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] keygit_protocol::ProtocolError),

    #[error("storage error: {0}")]
    Kv(#[from] keygit_kv::KvError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownService(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        status.into_response()
    }
}
