//! Telemenu server
//!
//! Serves the demo menu tree over the HTTP update adapter.

use std::net::SocketAddr;
use std::sync::Arc;
use telemenu::api::{create_router, AppState};
use telemenu::config::{BotConfig, StoreBackend};
use telemenu::runtime::{Dispatcher, LoggingSink, RenderSink};
use telemenu::store::{MemoryStore, SqliteStore, StateStore};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemenu=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env();

    let registry = Arc::new(telemenu::demo::registry()?);

    let store: Arc<dyn StateStore> = match config.store {
        StoreBackend::Sqlite => {
            if let Some(parent) = config.db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %config.db_path.display(), "Opening state database");
            Arc::new(SqliteStore::open(&config.db_path)?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory state store; conversations are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let sink: Arc<dyn RenderSink> = Arc::new(LoggingSink);

    let dispatcher =
        Dispatcher::new(registry, store, sink).with_idle_timeout(config.idle_timeout);
    let state = AppState::new(dispatcher);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Telemenu server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
