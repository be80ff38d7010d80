use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::handler;

/// Build the smart-HTTP router over `ctx`.
pub fn build_router(ctx: AppContext) -> Router {
    let body_limit = ctx.config().max_pack_size;
    Router::new()
        .route("/:owner/:repo/info/refs", get(handler::info_refs))
        .route("/:owner/:repo/:rpc", post(handler::service_rpc))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
