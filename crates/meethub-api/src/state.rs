//! Application state shared across all handlers.

use std::sync::Arc;

use meethub_core::config::AppConfig;
use meethub_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Realtime engine.
    pub engine: Arc<RealtimeEngine>,
}
