use std::future::{Future, IntoFuture};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::ServerResult;
use crate::router::build_router;

/// Keygit smart-HTTP server.
#[derive(Debug)]
pub struct KeygitServer {
    context: AppContext,
}

impl KeygitServer {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.context.clone())
    }

    /// Bind the configured address and serve until `signal` completes.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.context.config().bind_addr).await?;
        self.serve_on(listener, signal).await
    }

    /// Serve on an already bound listener.
    ///
    /// Once `signal` fires no new connections are accepted. In-flight requests
    /// get `shutdown_grace_secs` to finish before the server returns anyway.
    pub async fn serve_on<F>(self, listener: TcpListener, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grace = Duration::from_secs(self.context.config().shutdown_grace_secs);
        info!(addr = %listener.local_addr()?, "keygit server listening");

        let (stopping_tx, stopping_rx) = oneshot::channel();
        let shutdown = async move {
            signal.await;
            let _ = stopping_tx.send(());
        };
        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => return Ok(result?),
            _ = stopping_rx => info!("shutdown requested, draining connections"),
        }
        match tokio::time::timeout(grace, server).await {
            Ok(result) => result?,
            Err(_) => warn!(?grace, "grace period elapsed, closing remaining connections"),
        }
        info!("keygit server stopped");
        Ok(())
    }
}
