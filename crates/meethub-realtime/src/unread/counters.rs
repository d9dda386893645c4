//! Per-room, per-user unread message counters.
//!
//! Counts live only in memory; durable unread state, if ever required,
//! is recomputed from message storage on restart. Atomicity of
//! concurrent increments is inherited from the hub's serialized
//! command processing.

use std::collections::HashMap;

use meethub_core::types::id::{RoomId, UserId};

/// Unread counter table keyed by (room, user).
#[derive(Debug, Default)]
pub struct UnreadCounters {
    counts: HashMap<(RoomId, UserId), u32>,
}

impl UnreadCounters {
    /// Create an empty counter table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a user's counter for a room, returning the new value.
    pub fn increment(&mut self, room_id: RoomId, user_id: UserId) -> u32 {
        let count = self.counts.entry((room_id, user_id)).or_insert(0);
        *count += 1;
        *count
    }

    /// Reset a user's counter for a room to zero.
    pub fn reset(&mut self, room_id: RoomId, user_id: UserId) {
        self.counts.remove(&(room_id, user_id));
    }

    /// Current counter value (zero if never incremented).
    pub fn get(&self, room_id: RoomId, user_id: UserId) -> u32 {
        self.counts.get(&(room_id, user_id)).copied().unwrap_or(0)
    }

    /// Drop every counter for a room (room deleted or support closed).
    pub fn purge_room(&mut self, room_id: RoomId) {
        self.counts.retain(|(rid, _), _| *rid != room_id);
    }
}
