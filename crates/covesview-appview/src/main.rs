use std::sync::Arc;
use std::time::Duration;

use covesview_core::config::AppConfig;
use covesview_core::traits::{IdentityCacheStore, RecordStore, SessionStore};
use covesview_crypto::TidGenerator;
use covesview_dataserver::HttpDataServerClient;
use covesview_firehose::FirehoseClient;
use covesview_identity::IdentityResolver;
use covesview_imageproxy::{FsImageCache, ImageProxyService};
use covesview_server::{AppState, build_router};
use covesview_storage_sqlite::store::SqliteStore;
use covesview_write::vote::VoteCache;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().pretty().init();

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/appview.toml".to_string());
    let config = AppConfig::load(&config_path)?;

    let store = SqliteStore::connect(&config.database.url).await?;

    let identity_cache: Arc<dyn IdentityCacheStore> = Arc::new(store.clone());
    let identity = Arc::new(IdentityResolver::new(
        identity_cache,
        config.identity.plc_directory_url.clone(),
        config.identity.cache_ttl_secs,
    ));

    let image_cache = FsImageCache::new(config.image_proxy.cache_path.clone())?;
    let image_proxy = Arc::new(ImageProxyService::new(identity.clone(), image_cache));

    let record_store: Arc<dyn RecordStore> = Arc::new(store.clone());
    let session_store: Arc<dyn SessionStore> = Arc::new(store.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let firehose = FirehoseClient::new(
        config.firehose.relay_url.clone(),
        Duration::from_secs(config.firehose.backoff_cap_secs),
        record_store.clone(),
        identity.clone(),
        session_store.clone(),
    );
    let firehose_handle = tokio::spawn(async move { firehose.run(shutdown_rx).await });

    let eviction_cache_path = config.image_proxy.cache_path.clone();
    let eviction_max_bytes = config.image_proxy.cache_max_bytes;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            if let Err(e) = covesview_imageproxy::eviction::evict_to_fit(
                std::path::Path::new(&eviction_cache_path),
                eviction_max_bytes,
            )
            .await
            {
                tracing::warn!("image cache eviction failed: {e}");
            }
        }
    });

    let addr = format!("0.0.0.0:{}", config.port);

    let state = AppState {
        store: Arc::new(store.clone()),
        sessions: Arc::new(store),
        dataserver: Arc::new(HttpDataServerClient::new()),
        identity,
        image_proxy,
        tid: Arc::new(TidGenerator::new()),
        votes: Arc::new(VoteCache::new()),
        config: Arc::new(config),
    };

    let router = build_router(state);

    tracing::info!("covesview-appview starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    firehose_handle.abort();
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
