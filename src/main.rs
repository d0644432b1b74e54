//! Nourish chat - nutrition advice chat service
//!
//! A Rust backend running the chat widget's session store, reply
//! strategies and typed-out reveal behind an HTTP/SSE API.

mod api;
mod config;
mod responder;
mod runtime;
mod session;
mod state_machine;
mod storage;

use api::{create_router, AppState};
use config::ChatConfig;
use runtime::RuntimeHandle;
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
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
                .unwrap_or_else(|_| "nourish_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env();
    tracing::info!(
        responder = ?config.responder,
        port = config.port,
        reveal_delay_ms = %config.reveal.initial_delay.as_millis(),
        reveal_tick_ms = %config.reveal.tick_interval.as_millis(),
        "Loaded configuration"
    );

    // Sessions
    let storage = storage::open(&config.db_path)?;
    let sessions = Arc::new(SessionStore::load(storage)?);

    // Reply strategy and runtime
    let responder = responder::from_config(&config)?;
    let runtime = RuntimeHandle::spawn(sessions, responder, config.reveal);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true).deflate(true);

    let app = create_router(AppState::new(runtime))
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Nourish chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
