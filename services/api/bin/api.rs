//! Main Entrypoint for the Mission Relay Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the session store and the Gemini Live backend.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use gemini_realtime::GeminiLiveBackend;
use mission_api::{config::Config, router::create_router, state::AppState, ws::Relay};
use mission_core::{LiveBackend, SessionStore, store::InMemorySessionStore};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal. Shutting down gracefully..."),
        Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Store and Backend ---
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let backend: Arc<dyn LiveBackend> = Arc::new(GeminiLiveBackend::new(
        config.gemini_api_key.clone(),
        config.gemini_live_url.clone(),
    ));
    let relay = Relay::new(
        store,
        backend,
        config.app_name.clone(),
        config.model_id.clone(),
        config.queue_depth_warning,
    );

    let app_state = Arc::new(AppState { relay });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        app_name = %config.app_name,
        model = config.model_id.as_deref().unwrap_or("default"),
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
