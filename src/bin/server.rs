// File: ./src/bin/server.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use todobin::config::{Config, ServerConfig, StorageBackend};
use todobin::hub::Hub;
use todobin::server::{self, AppState};
use todobin::service::ListService;
use todobin::storage::LocalStorage;
use todobin::store::{FileStore, ListStore, MemoryStore};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_store(cfg: &ServerConfig) -> Result<Arc<dyn ListStore>> {
    match cfg.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => {
            let dir = match &cfg.data_dir {
                Some(dir) => dir.clone(),
                None => LocalStorage::data_dir()
                    .context("no data directory available for the file store")?
                    .join("lists"),
            };
            let store = FileStore::open(&dir)
                .with_context(|| format!("opening store at {}", dir.display()))?;
            tracing::info!(path = %store.root().display(), "using file store");
            Ok(Arc::new(store))
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let cfg = config.server;
    init_tracing(cfg.log_json);

    let store = open_store(&cfg)?;
    let service = Arc::new(ListService::new(store, cfg.service_settings()));
    let hub = Arc::new(Hub::new(cfg.enable_websocket));

    let janitor = server::janitor::spawn(
        service.clone(),
        Duration::from_secs(cfg.cleanup_interval_secs),
    );

    let app = server::build_router(AppState::new(service, hub), cfg.max_body_bytes);
    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(bind = %cfg.bind, websocket = cfg.enable_websocket, "todobin server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server failed")?;

    janitor.abort();
    tracing::info!("server stopped");
    Ok(())
}
