//! Guess pool backend entrypoint wiring REST, SSE and the storage supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guess_pool_back::{
    config::AppConfig,
    dao::pool_store::memory::MemoryPoolStore,
    routes,
    services::sse_events,
    state::{AppState, SharedState},
};

/// Selects the storage backend: `memory` or `mongo`.
const POOL_STORE_ENV: &str = "POOL_STORE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);
    tokio::spawn(sse_events::relay_system_status(app_state.clone()));

    start_storage(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the configured pool store. MongoDB is supervised in the background
/// and the server answers 503 until the first connection succeeds.
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var(POOL_STORE_ENV).unwrap_or_else(|_| default_backend().into());

    match backend.as_str() {
        "memory" => {
            info!("using in-memory pool store");
            state
                .install_pool_store(Arc::new(MemoryPoolStore::new()))
                .await;
            Ok(())
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use guess_pool_back::{
                dao::pool_store::{
                    PoolStore,
                    mongodb::{MongoConfig, MongoPoolStore},
                },
                dao::storage::StorageError,
                services::storage_supervisor,
            };

            info!("using MongoDB pool store");
            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let store = MongoPoolStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PoolStore>)
            }));
            Ok(())
        }
        other => anyhow::bail!("unsupported {POOL_STORE_ENV} value `{other}`"),
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else {
        "memory"
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "could not install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
