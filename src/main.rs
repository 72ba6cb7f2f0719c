//! pixtier - a tiered image-hosting server.
//!
//! This binary wires the stores, the host service and the HTTP router
//! together and serves the API.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixtier::{
    config::Config,
    create_router,
    service::ServiceError,
    store::{BlobStore, FsBlobStore, MemoryBlobStore, MemoryMetaStore},
    HostService, RouterConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // Metadata lives in memory; a database-backed MetaStore slots in
    // behind the same trait for multi-process deployments.
    match config.data_dir.clone() {
        Some(dir) => {
            info!("Blob storage: {}", dir.display());
            let blobs = match FsBlobStore::new(&dir) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to open blob directory: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            serve(config, blobs).await
        }
        None => {
            warn!("Blob storage: in-memory (assets vanish on restart)");
            serve(config, Arc::new(MemoryBlobStore::new())).await
        }
    }
}

async fn serve<B: BlobStore>(config: Config, blobs: Arc<B>) -> ExitCode {
    let meta = Arc::new(MemoryMetaStore::new());
    let service = HostService::with_cache_capacity(meta, blobs, config.cache_bytes);

    if config.seed_tiers {
        if let Err(e) = seed_builtin_tiers(&service).await {
            error!("Failed to seed built-in tiers: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut router_config = RouterConfig::new().with_cache_max_age(config.cache_max_age);
    if let Some(origins) = config.cors_origin_list() {
        router_config = router_config.with_cors_origins(origins);
    }
    if let Some(url) = &config.public_url {
        router_config = router_config.with_public_url(url);
    }

    let router = create_router(service, router_config);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on http://{}", addr);
    info!("  curl http://{}/health", addr);

    match axum::serve(listener, router).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Create the classic three-tier setup: Basic (200px thumbnails),
/// Premium (200px + 400px, original retained), Enterprise (Premium plus
/// expiring links).
async fn seed_builtin_tiers<M, B>(service: &HostService<M, B>) -> Result<(), ServiceError>
where
    M: pixtier::MetaStore,
    B: BlobStore,
{
    service.create_policy("Basic", &[200], false, false).await?;
    service
        .create_policy("Premium", &[200, 400], true, false)
        .await?;
    service
        .create_policy("Enterprise", &[200, 400], true, true)
        .await?;
    info!("Seeded built-in tiers: Basic, Premium, Enterprise");
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "pixtier=info,tower_http=info",
        1 => "pixtier=debug,tower_http=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
