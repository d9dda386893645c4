//! Storage collaborator traits.
//!
//! These traits are the entire storage surface the realtime core is
//! allowed to touch. Implementations are expected to be simple
//! request/response calls; retry policy belongs to the caller.

use async_trait::async_trait;

use meethub_core::result::AppResult;
use meethub_core::types::id::{RoomId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;
use meethub_entity::user::User;

/// Read/write access to chat rooms.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Find a room by its identifier.
    async fn find_by_id(&self, id: RoomId) -> AppResult<Option<Room>>;

    /// Find all rooms a user belongs to.
    async fn find_by_member(&self, user_id: UserId) -> AppResult<Vec<Room>>;

    /// Create or fully replace a room.
    async fn save(&self, room: &Room) -> AppResult<()>;
}

/// Read access to user accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by identifier.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;
}

/// Write access to chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persist a new message.
    async fn save(&self, message: &Message) -> AppResult<()>;

    /// Fetch the most recent messages for a room, newest last.
    async fn recent(&self, room_id: RoomId, limit: usize) -> AppResult<Vec<Message>>;
}
