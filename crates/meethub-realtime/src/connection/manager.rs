//! Connection manager — the gateway dispatcher.
//!
//! Registers and unregisters authenticated connections, translates
//! inbound client events into hub commands (prefetching any storage
//! state a command needs, so the hub itself never awaits), and fans
//! hub effects back out to connections. Holds no business state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use meethub_core::config::realtime::RealtimeConfig;
use meethub_core::types::id::{RoomId, SessionId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;
use meethub_entity::user::UserRole;
use meethub_store::RoomStore;

use crate::hub::{HubCommand, HubHandle};
use crate::message::types::{ClientEvent, ServerEvent};
use crate::metrics::RealtimeMetrics;

use super::handle::{ConnectionHandle, ConnectionId};
use super::pool::ConnectionPool;

/// Manages all active WebSocket connections.
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Hub mailbox.
    hub: HubHandle,
    /// Room storage collaborator (prefetch only).
    rooms: Arc<dyn RoomStore>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.pool.connection_count())
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        hub: HubHandle,
        rooms: Arc<dyn RoomStore>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            hub,
            rooms,
            metrics,
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Returns the connection handle and a receiver for outbound events.
    pub async fn register(
        &self,
        user_id: UserId,
        session_id: SessionId,
        role: UserRole,
        username: String,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);

        let handle = Arc::new(ConnectionHandle::new(
            user_id,
            session_id,
            role,
            username.clone(),
            tx,
        ));

        // Check max connections per user
        let existing = self.pool.get_user_connections(&user_id);
        if existing.len() >= self.config.max_connections_per_user {
            warn!(
                user_id = %user_id,
                count = existing.len(),
                max = self.config.max_connections_per_user,
                "User at max connections, oldest will be replaced"
            );
            if let Some(oldest) = existing.first() {
                oldest.mark_dead();
                self.pool.remove(&oldest.id);
                self.hub
                    .send(HubCommand::Disconnected { conn_id: oldest.id })
                    .await;
            }
        }

        self.pool.add(handle.clone());
        self.metrics.connection_opened();

        // Prefetch the user's rooms so the hub can attach them and
        // flip presence without touching storage itself.
        let rooms = match self.rooms.find_by_member(user_id).await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Room prefetch failed on connect");
                Vec::new()
            }
        };

        self.hub
            .send(HubCommand::Connected {
                conn_id: handle.id,
                user_id,
                username,
                role,
                rooms,
            })
            .await;

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            session_id = %session_id,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection and updates presence.
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.remove(conn_id) {
            handle.mark_dead();
            self.metrics.connection_closed();
            self.hub
                .send(HubCommand::Disconnected { conn_id: *conn_id })
                .await;

            info!(
                conn_id = %conn_id,
                user_id = %handle.user_id,
                "WebSocket connection unregistered"
            );
        }
    }

    /// Processes an inbound event from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Event from unknown connection");
            return;
        };

        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                handle.send(ServerEvent::Error {
                    code: "INVALID_MESSAGE".to_string(),
                    message: format!("Failed to parse event: {e}"),
                });
                return;
            }
        };

        self.metrics.event_received();

        match event {
            ClientEvent::Pong { .. } => {
                handle.record_pong().await;
            }
            ClientEvent::UserOffline => {
                self.hub
                    .send(HubCommand::ExplicitOffline { conn_id: *conn_id })
                    .await;
            }
            ClientEvent::JoinRoom { room_id } => {
                if let Some(fetched) = self.prefetch_room(&handle, room_id).await {
                    self.hub
                        .send(HubCommand::JoinRoom {
                            conn_id: *conn_id,
                            user_id: handle.user_id,
                            room_id,
                            fetched,
                        })
                        .await;
                }
            }
            ClientEvent::GetRoomOnlineMembers { room_id } => {
                if let Some(fetched) = self.prefetch_room(&handle, room_id).await {
                    self.hub
                        .send(HubCommand::GetRoomOnlineMembers {
                            conn_id: *conn_id,
                            user_id: handle.user_id,
                            room_id,
                            fetched,
                        })
                        .await;
                }
            }
            ClientEvent::MarkRoomRead { room_id } => {
                self.hub
                    .send(HubCommand::MarkRoomRead {
                        room_id,
                        user_id: handle.user_id,
                    })
                    .await;
            }
            ClientEvent::GetUnreadCount { room_id } => {
                self.hub
                    .send(HubCommand::GetUnreadCount {
                        conn_id: *conn_id,
                        room_id,
                        user_id: handle.user_id,
                    })
                    .await;
            }
            ClientEvent::SendMessage { room_id, text } => {
                if text.trim().is_empty() {
                    handle.send(ServerEvent::Error {
                        code: "INVALID_MESSAGE".to_string(),
                        message: "Message text must not be empty".to_string(),
                    });
                    return;
                }
                if let Some(fetched) = self.prefetch_room(&handle, room_id).await {
                    let message =
                        Message::new(room_id, handle.user_id, handle.username.clone(), text);
                    self.hub
                        .send(HubCommand::MessageCreated {
                            conn_id: *conn_id,
                            message,
                            fetched,
                        })
                        .await;
                }
            }
            ClientEvent::UserRequestSupport => {
                self.hub
                    .send(HubCommand::RequestSupport {
                        user_id: handle.user_id,
                        username: handle.username.clone(),
                    })
                    .await;
            }
            ClientEvent::AdminJoinSupportRoom { room_id } => {
                if !handle.role.is_admin() {
                    handle.send(ServerEvent::Error {
                        code: "FORBIDDEN".to_string(),
                        message: "Only admins can claim support rooms".to_string(),
                    });
                    return;
                }
                self.hub
                    .send(HubCommand::AdminJoinSupportRoom {
                        conn_id: *conn_id,
                        room_id,
                        admin_id: handle.user_id,
                        admin_name: handle.username.clone(),
                    })
                    .await;
            }
            ClientEvent::CloseSupportRoom { room_id } => {
                self.hub
                    .send(HubCommand::CloseSupportRoom {
                        conn_id: *conn_id,
                        room_id,
                        closed_by: handle.user_id,
                    })
                    .await;
            }
        }
    }

    /// Fetch a room from storage for a hub command.
    ///
    /// Returns `None` when the collaborator failed (already reported to
    /// the connection); `Some(None)` when storage simply has no such
    /// room, which the hub resolves against its own attached rooms.
    async fn prefetch_room(
        &self,
        handle: &ConnectionHandle,
        room_id: RoomId,
    ) -> Option<Option<Room>> {
        match self.rooms.find_by_id(room_id).await {
            Ok(fetched) => Some(fetched),
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Room lookup failed");
                handle.send(ServerEvent::Error {
                    code: "OPERATION_FAILED".to_string(),
                    message: "Storage lookup failed, try again".to_string(),
                });
                None
            }
        }
    }

    // ── Fan-out ──────────────────────────────────────────────

    /// Sends an event to a specific connection.
    pub fn send_to_conn(&self, conn_id: &ConnectionId, event: ServerEvent) {
        if let Some(handle) = self.pool.get(conn_id) {
            if handle.send(event) {
                self.metrics.event_sent();
            }
        }
    }

    /// Sends an event to all connections of a user.
    pub fn send_to_user(&self, user_id: &UserId, event: ServerEvent) {
        for conn in self.pool.get_user_connections(user_id) {
            if conn.send(event.clone()) {
                self.metrics.event_sent();
            }
        }
    }

    /// Sends an event to all connections of each listed user.
    pub fn send_to_users(&self, user_ids: &[UserId], event: ServerEvent) {
        for user_id in user_ids {
            self.send_to_user(user_id, event.clone());
        }
    }

    /// Closes all connections (shutdown).
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            conn.mark_dead();
            self.pool.remove(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Checks if a user is currently connected.
    pub fn is_user_connected(&self, user_id: &UserId) -> bool {
        !self.pool.get_user_connections(user_id).is_empty()
    }
}
