//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, and a summary of the asset pipeline it serves.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Short git revision the binary was built from.
    pub commit: String,
    pub uptime_seconds: u64,
    pub assets: AssetsHealth,
}

#[derive(Serialize, Deserialize)]
pub struct AssetsHealth {
    pub version: String,
    pub count: usize,
    pub context_root: String,
    /// In match order, most specific first.
    pub subcontexts: Vec<String>,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("WEBCONSOLE_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        assets: AssetsHealth {
            version: state.asset_version.clone(),
            count: state.asset_count,
            context_root: state.context_root.clone(),
            subcontexts: state.subcontexts.clone(),
        },
    })
}
