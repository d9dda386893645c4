//! In-memory store implementation.
//!
//! Backs the server binary in single-process deployments and every test
//! suite. All maps are concurrent; each call is an independent
//! request/response, matching the behavior the realtime core expects
//! from the external document store.

use async_trait::async_trait;
use dashmap::DashMap;

use meethub_core::result::AppResult;
use meethub_core::types::id::{RoomId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;
use meethub_entity::user::User;

use crate::traits::{MessageStore, RoomStore, UserStore};

/// In-memory implementation of all storage collaborator traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Room ID → room.
    rooms: DashMap<RoomId, Room>,
    /// User ID → user.
    users: DashMap<UserId, User>,
    /// Room ID → messages in arrival order.
    messages: DashMap<RoomId, Vec<Message>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record (test and bootstrap helper).
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Seed a room record (test and bootstrap helper).
    pub fn insert_room(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn find_by_id(&self, id: RoomId) -> AppResult<Option<Room>> {
        Ok(self.rooms.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_member(&self, user_id: UserId) -> AppResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|entry| entry.value().is_member(user_id))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn save(&self, room: &Room) -> AppResult<()> {
        self.rooms.insert(room.id, room.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save(&self, message: &Message) -> AppResult<()> {
        self.messages
            .entry(message.room_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent(&self, room_id: RoomId, limit: usize) -> AppResult<Vec<Message>> {
        Ok(self
            .messages
            .get(&room_id)
            .map(|msgs| {
                let start = msgs.len().saturating_sub(limit);
                msgs[start..].to_vec()
            })
            .unwrap_or_default())
    }
}
