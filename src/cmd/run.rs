//! `webconsole run`: start the asset server.
//!
//! Loads and validates configuration, snapshots the asset directory,
//! builds the middleware pipeline (a missing subcontext index aborts
//! startup here), and serves it with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::assets::{AssetStore, DirAssetStore};
use crate::cli::RunArgs;
use crate::config;
use crate::error::WebConsoleError;
use crate::logging;
use crate::middleware::{CacheValidation, Compression, ConfigScript, Pipeline, RouteFallback};
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), WebConsoleError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let path = config::discover(args.config.as_deref()).await?;
    let mut config = config::load(&path).await?;

    // A relative assets_dir in the file is relative to the file; the flag
    // is relative to the working directory.
    match args.assets_dir {
        Some(dir) => config.assets_dir = dir,
        None => {
            if let Some(base) = path.parent() {
                config.assets_dir = base.join(&config.assets_dir);
            }
        }
    }
    if let Some(version) = args.asset_version {
        config.version = Some(version);
    }

    let assets_dir = config.assets_dir.clone();
    let store = tokio::task::spawn_blocking(move || DirAssetStore::load(&assets_dir))
        .await
        .map_err(|e| WebConsoleError::Io(std::io::Error::other(e)))??;

    let version = config.version.clone().unwrap_or_else(|| {
        let digest = store.digest();
        digest.get(..12).unwrap_or(&digest).to_string()
    });

    tracing::debug!(
        dir = %store.root().display(),
        assets = store.len(),
        version = %version,
        "asset snapshot ready"
    );

    let store: Arc<dyn AssetStore> = Arc::new(store);
    let fallback = RouteFallback::new(
        Arc::clone(&store),
        &config.context_root,
        &config.subcontexts,
    )?;
    let pipeline = Pipeline::from_stages(
        store,
        Compression::with_level(args.gzip_level),
        CacheValidation::new(version),
        ConfigScript::new(config.console.clone()),
        fallback,
    );

    let state = Arc::new(AppState::new(&pipeline, &config.context_root));
    let asset_count = state.asset_count;
    let asset_version = state.asset_version.clone();
    let router = server::build_router(state, pipeline);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config = %path.display(),
        assets = asset_count,
        version = %asset_version,
        context_root = %config.context_root,
        subcontexts = config.subcontext_count(),
        "webconsole started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("webconsole stopped");
    Ok(())
}
