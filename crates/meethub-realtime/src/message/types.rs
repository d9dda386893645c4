//! Inbound and outbound gateway event definitions.
//!
//! Every event is a tagged variant; payload shape is enforced at
//! deserialization, so a malformed frame is rejected at the boundary
//! with `INVALID_MESSAGE` instead of surfacing as a shape error deeper
//! in the pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use meethub_core::types::id::{RoomId, UserId};
use meethub_entity::message::Message;

/// Events sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe this connection to a room and fetch its online snapshot.
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },
    /// Request the current online-member snapshot for a room.
    GetRoomOnlineMembers {
        /// Target room.
        room_id: RoomId,
    },
    /// Reset the caller's unread counter for a room.
    MarkRoomRead {
        /// Target room.
        room_id: RoomId,
    },
    /// Query the caller's unread counter for a room.
    GetUnreadCount {
        /// Target room.
        room_id: RoomId,
    },
    /// Send a chat message to a room.
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Message body.
        text: String,
    },
    /// Request a support conversation with an admin.
    UserRequestSupport,
    /// Admin claims a pending support room.
    AdminJoinSupportRoom {
        /// The pending support room.
        room_id: RoomId,
    },
    /// Close an active or assigned support room.
    CloseSupportRoom {
        /// The support room.
        room_id: RoomId,
    },
    /// Explicit presence teardown (tab close).
    UserOffline,
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Online-member snapshot push.
    RoomOnlineMembers {
        /// Room.
        room_id: RoomId,
        /// Members currently online.
        online_member_ids: Vec<UserId>,
    },
    /// Unread counter push.
    UnreadCountUpdated {
        /// Room.
        room_id: RoomId,
        /// New counter value.
        unread_count: u32,
    },
    /// Read-ack broadcast.
    RoomMarkedRead {
        /// Room.
        room_id: RoomId,
        /// The user who marked it read.
        user_id: UserId,
    },
    /// New chat message broadcast.
    NewMessage {
        /// Room.
        room_id: RoomId,
        /// The message.
        message: Message,
    },
    /// Support request accepted but no admin is available yet.
    SupportRoomPending {
        /// The support room awaiting an admin.
        room_id: RoomId,
    },
    /// Support ticket assigned to an admin (user-facing).
    SupportRoomAssigned {
        /// The support room.
        room_id: RoomId,
        /// The assigned admin.
        admin: AdminProfile,
    },
    /// An admin explicitly claimed the pending room (user-facing).
    SupportAdminJoined {
        /// The support room.
        room_id: RoomId,
        /// The claiming admin.
        admin: AdminProfile,
    },
    /// Deadline reassignment notice.
    SupportAdminChanged {
        /// The support room.
        room_id: RoomId,
        /// The requesting user.
        user_id: UserId,
        /// The newly assigned admin, if one was available.
        new_admin_id: Option<UserId>,
    },
    /// Support room closed.
    SupportRoomClosed {
        /// The support room.
        room_id: RoomId,
        /// Who closed it.
        closed_by: UserId,
    },
    /// Admin-facing ticket notice; `code` distinguishes variants.
    SupportTicketAssigned {
        /// The support room.
        room_id: RoomId,
        /// The requesting user.
        user_id: UserId,
        /// The requesting user's display name.
        user_name: String,
        /// Signal variant, if this is not a direct assignment.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<TicketCode>,
    },
    /// Connection rejected during authentication.
    AuthError {
        /// Failure code.
        code: AuthErrorCode,
        /// Human-readable description.
        message: String,
    },
    /// Non-fatal error scoped to the originating connection.
    Error {
        /// Error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// Server keepalive ping.
    Ping {
        /// Server timestamp.
        timestamp: i64,
    },
}

/// Minimal admin identity carried in support events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    /// Admin user ID.
    pub id: UserId,
    /// Admin display name.
    pub username: String,
}

/// Signal variants carried by `support_ticket_assigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCode {
    /// The requesting user already has an unresolved ticket; the event
    /// references the existing room.
    AssignAdminError,
    /// A new support room is pending; any admin may claim it.
    PendingSupport,
}

/// Authentication failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    /// No token was presented.
    TokenMissing,
    /// The token failed verification.
    TokenInvalid,
}

impl ServerEvent {
    /// Build a keepalive ping stamped with the current time.
    pub fn ping_now() -> Self {
        Self::Ping {
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Build a not-found error for the originating connection.
    pub fn not_found(what: &str) -> Self {
        Self::Error {
            code: "NOT_FOUND".to_string(),
            message: format!("{what} not found"),
        }
    }

    /// Build a not-a-member error for the originating connection.
    pub fn not_a_member(room_id: RoomId) -> Self {
        Self::Error {
            code: "NOT_A_MEMBER".to_string(),
            message: format!("Not a member of room {room_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_tag_names() {
        let evt: ClientEvent =
            serde_json::from_str(r#"{"type":"user_request_support"}"#).expect("parse");
        assert!(matches!(evt, ClientEvent::UserRequestSupport));

        let room = RoomId::new();
        let raw = format!(r#"{{"type":"join_room","roomId":"{room}"}}"#);
        let evt: ClientEvent = serde_json::from_str(&raw).expect("parse");
        assert!(matches!(evt, ClientEvent::JoinRoom { room_id } if room_id == room));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        // Missing required field.
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"join_room"}"#).is_err());
        // Unknown tag.
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"warp_drive"}"#).is_err());
    }

    #[test]
    fn test_server_event_payload_casing() {
        let event = ServerEvent::SupportAdminChanged {
            room_id: RoomId::new(),
            user_id: UserId::new(),
            new_admin_id: Some(UserId::new()),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""type":"support_admin_changed""#));
        assert!(json.contains("newAdminId"));
        assert!(json.contains("roomId"));
    }

    #[test]
    fn test_ticket_code_wire_format() {
        let json = serde_json::to_string(&TicketCode::AssignAdminError).expect("serialize");
        assert_eq!(json, r#""ASSIGN_ADMIN_ERROR""#);
        let json = serde_json::to_string(&AuthErrorCode::TokenMissing).expect("serialize");
        assert_eq!(json, r#""TOKEN_MISSING""#);
    }
}
