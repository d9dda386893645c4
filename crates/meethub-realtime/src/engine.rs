//! Top-level realtime engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use meethub_auth::jwt::decoder::JwtDecoder;
use meethub_core::config::realtime::RealtimeConfig;
use meethub_core::config::support::SupportConfig;
use meethub_core::error::AppError;
use meethub_store::{MessageStore, RoomStore};

use crate::connection::authenticator::WsAuthenticator;
use crate::connection::manager::ConnectionManager;
use crate::hub::{Hub, HubHandle, HubState};
use crate::metrics::RealtimeMetrics;

/// Central realtime engine coordinating the hub and the gateway.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager / dispatcher.
    pub connections: Arc<ConnectionManager>,
    /// Handshake authenticator.
    pub authenticator: WsAuthenticator,
    /// Hub mailbox.
    pub hub: HubHandle,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Realtime configuration (heartbeat intervals, buffers).
    pub config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine and spawns the hub task.
    pub fn new(
        config: RealtimeConfig,
        support: SupportConfig,
        decoder: Arc<JwtDecoder>,
        rooms: Arc<dyn RoomStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (tx, rx) = mpsc::channel(config.mailbox_capacity);

        let metrics = Arc::new(RealtimeMetrics::new());
        let hub_handle = HubHandle::new(tx.clone());
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            hub_handle.clone(),
            Arc::clone(&rooms),
            Arc::clone(&metrics),
        ));
        let authenticator = WsAuthenticator::new(decoder);

        let hub = Hub::new(
            HubState::new(&support),
            rx,
            tx,
            Arc::clone(&connections),
            rooms,
            messages,
        );
        tokio::spawn(hub.run(shutdown_rx));

        info!("Realtime engine initialized");

        Self {
            connections,
            authenticator,
            hub: hub_handle,
            metrics,
            config,
            shutdown_tx,
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the realtime engine.
    pub fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down realtime engine");

        let _ = self.shutdown_tx.send(());
        self.connections.close_all();

        info!("Realtime engine shut down");
        Ok(())
    }
}
