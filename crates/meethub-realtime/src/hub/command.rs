//! Commands processed by the hub, one at a time.
//!
//! Every mutation of presence, membership snapshots, unread counters,
//! or the ticket table enters through exactly one of these variants.
//! Collaborator lookups happen before a command is enqueued; command
//! processing itself never awaits.

use meethub_core::types::id::{RoomId, TicketId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;
use meethub_entity::user::UserRole;

use crate::connection::handle::ConnectionId;

/// A single serialized unit of work for the hub.
#[derive(Debug)]
pub enum HubCommand {
    /// A connection finished authenticating and registering.
    Connected {
        /// The new connection.
        conn_id: ConnectionId,
        /// Authenticated user.
        user_id: UserId,
        /// Display name.
        username: String,
        /// Role from the token.
        role: UserRole,
        /// The user's rooms, prefetched from storage.
        rooms: Vec<Room>,
    },
    /// A connection closed (socket close, error, or heartbeat timeout).
    Disconnected {
        /// The closed connection.
        conn_id: ConnectionId,
    },
    /// Explicit presence teardown requested by the client (tab close).
    ExplicitOffline {
        /// The connection tearing down.
        conn_id: ConnectionId,
    },
    /// Subscribe a connection to a room and return its snapshot.
    JoinRoom {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The requesting user.
        user_id: UserId,
        /// Target room.
        room_id: RoomId,
        /// Room prefetched from storage, if it was found there.
        fetched: Option<Room>,
    },
    /// Query a room's online-member snapshot.
    GetRoomOnlineMembers {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The requesting user.
        user_id: UserId,
        /// Target room.
        room_id: RoomId,
        /// Room prefetched from storage, if it was found there.
        fetched: Option<Room>,
    },
    /// Reset the user's unread counter for a room.
    MarkRoomRead {
        /// Target room.
        room_id: RoomId,
        /// The user marking it read.
        user_id: UserId,
    },
    /// Query the user's unread counter for a room.
    GetUnreadCount {
        /// Originating connection.
        conn_id: ConnectionId,
        /// Target room.
        room_id: RoomId,
        /// The requesting user.
        user_id: UserId,
    },
    /// A new chat message arrived.
    MessageCreated {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The message (already stamped with id and timestamp).
        message: Message,
        /// Room prefetched from storage, if it was found there.
        fetched: Option<Room>,
    },
    /// A user requested a support conversation.
    RequestSupport {
        /// The requesting user.
        user_id: UserId,
        /// Display name, for admin-facing notices.
        username: String,
    },
    /// An admin claims a pending support room.
    AdminJoinSupportRoom {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The pending support room.
        room_id: RoomId,
        /// The claiming admin.
        admin_id: UserId,
        /// The admin's display name.
        admin_name: String,
    },
    /// Close an assigned/active support room.
    CloseSupportRoom {
        /// Originating connection.
        conn_id: ConnectionId,
        /// The support room.
        room_id: RoomId,
        /// Who is closing it.
        closed_by: UserId,
    },
    /// A response deadline fired.
    ///
    /// Carries the deadline token armed with it; if the ticket has
    /// transitioned since, the token no longer matches and the command
    /// is a no-op.
    SupportDeadlineElapsed {
        /// The ticket whose deadline fired.
        ticket_id: TicketId,
        /// Token identifying the armed deadline.
        token: u64,
    },
}
