//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared, read-only facts reported by
//! `/health`), [`build_router`] for mounting the asset pipeline under
//! the context root, and [`shutdown_signal`] for SIGTERM / Ctrl+C
//! handling.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::health::health_handler;
use crate::middleware::Pipeline;

#[derive(Debug)]
pub struct AppState {
    pub start_time: Instant,
    pub asset_version: String,
    pub asset_count: usize,
    pub context_root: String,
    pub subcontexts: Vec<String>,
}

impl AppState {
    #[must_use]
    pub fn new(pipeline: &Pipeline, context_root: &str) -> Self {
        Self {
            start_time: Instant::now(),
            asset_version: pipeline.version().to_string(),
            asset_count: pipeline.asset_count(),
            context_root: context_root.to_string(),
            subcontexts: pipeline
                .route_fallback()
                .subcontexts()
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
        }
    }
}

/// `/health`, plus the pipeline mounted at the context root. With a
/// non-root context, `/` redirects to it.
pub fn build_router(state: Arc<AppState>, pipeline: Pipeline) -> Router {
    let assets = pipeline.into_router();
    let mount = state.context_root.trim_end_matches('/').to_string();

    let router = Router::new().route("/health", get(health_handler));
    let router = if mount.is_empty() {
        router.fallback_service(assets)
    } else {
        router
            .route("/", get(redirect_to_context_root))
            .nest_service(&mount, assets)
    };

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn redirect_to_context_root(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.context_root)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
