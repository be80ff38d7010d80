//! Smart-HTTP endpoint handlers.
//!
//! Storage is synchronous, so every session runs on the blocking pool.

use std::io::Read;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use flate2::read::GzDecoder;
use keygit_protocol::{
    service_announcement, AdvertisedRefs, ProtocolError, ReceivePackSession, ReceiveRequest,
    Service, UploadPackSession, UploadRequest,
};
use keygit_repo::Repository;
use serde::Deserialize;
use tracing::debug;

use crate::context::AppContext;
use crate::error::{ServerError, ServerResult};

#[derive(Debug, Deserialize)]
pub struct InfoRefsQuery {
    pub service: Option<String>,
}

/// Parse a service name from the URL. Names without the `git-` prefix do not
/// address this server at all.
fn parse_service(name: &str) -> ServerResult<Service> {
    if !name.starts_with("git-") {
        return Err(ServerError::NotFound);
    }
    Service::from_str(name).map_err(|e| match e {
        ProtocolError::UnknownService(name) => ServerError::UnknownService(name),
        other => ServerError::Protocol(other),
    })
}

fn git_response(content_type: &'static str, body: Vec<u8>) -> Response {
    (
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}

async fn blocking<T, F>(task: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// `GET /{owner}/{repo}/info/refs?service=git-...`
pub async fn info_refs(
    State(ctx): State<AppContext>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<InfoRefsQuery>,
) -> ServerResult<Response> {
    let service = parse_service(query.service.as_deref().ok_or(ServerError::NotFound)?)?;
    let repo = ctx.repository(&owner, &name)?;
    debug!(repo = repo.id(), %service, "advertising refs");

    let body = blocking(move || {
        let mut body = service_announcement(service)?.to_vec();
        body.extend_from_slice(&AdvertisedRefs::load(&repo, service)?.encode()?);
        Ok(body)
    })
    .await?;
    Ok(git_response(service.advertisement_content_type(), body))
}

/// `POST /{owner}/{repo}/git-...`
pub async fn service_rpc(
    State(ctx): State<AppContext>,
    Path((owner, name, rpc)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let service = parse_service(&rpc)?;
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type != Some(service.request_content_type()) {
        return Err(ServerError::NotFound);
    }
    let gzipped = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

    let repo = ctx.repository(&owner, &name)?;
    debug!(repo = repo.id(), %service, bytes = body.len(), gzipped, "service request");

    let limit = ctx.config().max_pack_size;
    let reply = blocking(move || {
        let body = if gzipped { gunzip(&body, limit)? } else { body.to_vec() };
        run_service(&repo, service, &body)
    })
    .await?;
    Ok(git_response(service.result_content_type(), reply))
}

/// Inflate a gzip body, refusing output larger than `limit`.
fn gunzip(data: &[u8], limit: usize) -> ServerResult<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(ServerError::PayloadTooLarge { limit });
    }
    Ok(out)
}

fn run_service(repo: &Repository, service: Service, body: &[u8]) -> ServerResult<Vec<u8>> {
    let reply = match service {
        Service::UploadPack => {
            let request = UploadRequest::decode(body)?;
            UploadPackSession::new(repo).upload_pack(&request)?
        }
        Service::ReceivePack => {
            let request = ReceiveRequest::decode(body)?;
            ReceivePackSession::new(repo).receive_pack(&request)?
        }
    };
    Ok(reply.to_vec())
}
