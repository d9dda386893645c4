//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use meethub_core::types::id::{SessionId, UserId};
use meethub_entity::user::UserRole;

use crate::message::types::ServerEvent;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing events to the client, plus
/// metadata about the connected user.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// Session ID from the access token.
    pub session_id: SessionId,
    /// User's role (cached for quick checks).
    pub role: UserRole,
    /// Username (cached for display).
    pub username: String,
    /// Sender for outbound events.
    sender: mpsc::Sender<ServerEvent>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    last_pong: tokio::sync::RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        role: UserRole,
        username: String,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            role,
            username,
            sender,
            connected_at: now,
            last_pong: tokio::sync::RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Send an event to this connection.
    ///
    /// Returns `false` if the event was dropped (buffer full or
    /// connection closed).
    pub fn send(&self, event: ServerEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response.
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Utc::now();
    }

    /// When the last pong was received.
    pub async fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().await
    }
}
