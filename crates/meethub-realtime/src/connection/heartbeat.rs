//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::message::types::ServerEvent;

use super::handle::ConnectionHandle;

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Timeout before considering the connection dead.
    pub ping_timeout: Duration,
}

/// Run the heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses. Marks the
/// connection dead if no pong arrives within the timeout; the socket
/// task then unregisters it like any other disconnect.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick fires immediately; skip it so a fresh connection
    // is not pinged before it finished the handshake.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let last_pong = handle.last_pong().await;
        let elapsed = Utc::now() - last_pong;
        if let Ok(elapsed) = elapsed.to_std() {
            if elapsed > config.ping_timeout {
                tracing::warn!(
                    conn_id = %handle.id,
                    elapsed_secs = elapsed.as_secs(),
                    "Heartbeat timeout, marking connection dead"
                );
                handle.mark_dead();
                break;
            }
        }

        if !handle.send(ServerEvent::ping_now()) {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, marking dead");
            handle.mark_dead();
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
