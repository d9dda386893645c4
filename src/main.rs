//! MeetHub Server — realtime presence and support-assignment gateway.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use meethub_core::config::AppConfig;
use meethub_core::error::AppError;
use meethub_store::MemoryStore;

#[tokio::main]
async fn main() {
    let env = std::env::var("MEETHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting MeetHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Storage collaborator ─────────────────────────────
    // Single-process deployment keeps rooms, users, and messages in
    // the in-memory store; a persistent document store plugs in behind
    // the same traits.
    let store = Arc::new(MemoryStore::new());

    // ── Step 2: Token verification ───────────────────────────────
    let jwt_decoder = Arc::new(meethub_auth::jwt::decoder::JwtDecoder::new(&config.auth));

    // ── Step 3: Realtime engine ──────────────────────────────────
    tracing::info!("Initializing realtime engine...");
    let engine = Arc::new(meethub_realtime::RealtimeEngine::new(
        config.realtime.clone(),
        config.support.clone(),
        jwt_decoder,
        store.clone(),
        store.clone(),
    ));

    // ── Step 4: HTTP server ──────────────────────────────────────
    let app_state = meethub_api::state::AppState {
        config: Arc::new(config.clone()),
        engine: Arc::clone(&engine),
    };

    let app = meethub_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("MeetHub server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let shutdown_engine = Arc::clone(&engine);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_engine.shutdown();
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("MeetHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
