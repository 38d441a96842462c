//! The asset-serving middleware pipeline.
//!
//! Four stages wrap [`serve_asset`](crate::assets::serve_asset). The
//! request passes through them top to bottom and the response returns
//! bottom to top:
//!
//! 1. [`compression`] -- gzip negotiation and streaming compression.
//! 2. [`cache`] -- weak ETag computation and `If-None-Match` handling.
//! 3. [`config_script`] -- renders the reserved `config.js`.
//! 4. [`fallback`] -- subcontext index fallback for client-side routes.
//!
//! Any stage may answer without calling the next one. Order is load
//! bearing: compression must precede cache validation so the ETag
//! reflects the negotiated encoding through [`VaryHeaders`].
//!
//! Every stage is a plain struct built once by [`Pipeline::new`] and
//! shared read-only behind an `Arc`; there is no per-request shared
//! mutable state.

pub mod cache;
pub mod compression;
pub mod config_script;
pub mod fallback;
pub mod sniff;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::assets::{serve_asset, AssetStore};
use crate::config::model::WebConsoleConfig;
use crate::error::WebConsoleError;

pub use cache::CacheValidation;
pub use compression::Compression;
pub use config_script::ConfigScript;
pub use fallback::RouteFallback;

/// Header names outer stages have committed to adding to `Vary`.
///
/// Travels as a request extension because the response, and so its
/// `Vary` header, does not exist yet when inner stages run.
#[derive(Debug, Clone, Default)]
pub struct VaryHeaders(Vec<HeaderName>);

impl VaryHeaders {
    pub fn push(&mut self, name: HeaderName) {
        if !self.0.contains(&name) {
            self.0.push(name);
        }
    }

    #[must_use]
    pub fn names(&self) -> &[HeaderName] {
        &self.0
    }
}

/// The four stages plus the asset store they sit in front of.
pub struct Pipeline {
    store: Arc<dyn AssetStore>,
    compression: Arc<Compression>,
    cache: Arc<CacheValidation>,
    config_script: Arc<ConfigScript>,
    fallback: Arc<RouteFallback>,
}

impl Pipeline {
    /// Build every stage. Fails if a subcontext index is missing from
    /// the store.
    pub fn new(
        store: Arc<dyn AssetStore>,
        version: impl Into<String>,
        console: WebConsoleConfig,
        context_root: &str,
        subcontexts: &std::collections::BTreeMap<String, String>,
    ) -> Result<Self, WebConsoleError> {
        let fallback = RouteFallback::new(Arc::clone(&store), context_root, subcontexts)?;
        Ok(Self::from_stages(
            store,
            Compression::new(),
            CacheValidation::new(version),
            ConfigScript::new(console),
            fallback,
        ))
    }

    #[must_use]
    pub fn from_stages(
        store: Arc<dyn AssetStore>,
        compression: Compression,
        cache: CacheValidation,
        config_script: ConfigScript,
        fallback: RouteFallback,
    ) -> Self {
        Self {
            store,
            compression: Arc::new(compression),
            cache: Arc::new(cache),
            config_script: Arc::new(config_script),
            fallback: Arc::new(fallback),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        self.cache.version()
    }

    #[must_use]
    pub fn route_fallback(&self) -> &RouteFallback {
        &self.fallback
    }

    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.store.len()
    }

    /// Assemble the stages around [`serve_asset`].
    ///
    /// `Router::layer` wraps outward, so the last layer added is the
    /// first to see a request.
    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(serve_asset)
            .with_state(self.store)
            .layer(from_fn_with_state(self.fallback, fallback::fallback))
            .layer(from_fn_with_state(self.config_script, config_script::inject))
            .layer(from_fn_with_state(self.cache, cache::validate))
            .layer(from_fn_with_state(self.compression, compression::compress))
    }
}
