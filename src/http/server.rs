//! Diagnostics HTTP server.
//!
//! # Responsibilities
//! - Build the axum router for the resolve and admin endpoints
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown signal arrives

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::cache::ModelCache;
use crate::config::ServerConfig;
use crate::http::resolve;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Shared state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<ModelCache>,
}

/// Build the router with all middleware layers.
#[allow(deprecated)]
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/resolve", get(resolve::resolve))
        .merge(admin::routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

/// HTTP server exposing the model for inspection.
pub struct DiagnosticsServer {
    router: Router,
}

impl DiagnosticsServer {
    pub fn new(cache: Arc<ModelCache>, config: &ServerConfig) -> Self {
        let state = AppState { cache };
        Self {
            router: router(state, Duration::from_secs(config.request_timeout_secs)),
        }
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let address = listener.local_addr()?;
        tracing::info!(address = %address, "Diagnostics server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Diagnostics server draining");
            })
            .await?;

        tracing::info!("Diagnostics server stopped");
        Ok(())
    }
}
