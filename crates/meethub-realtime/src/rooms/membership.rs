//! Room membership cache — per-room online-member snapshots.
//!
//! Each attached room carries a snapshot equal to the intersection of
//! its member list with the currently-online users. A presence flip
//! only touches the rooms that actually contain the affected user,
//! via the reverse index.

use std::collections::{HashMap, HashSet};

use meethub_core::types::id::{RoomId, UserId};
use meethub_entity::room::Room;

use crate::presence::registry::PresenceRegistry;

/// Cache of loaded rooms and their online-member snapshots.
#[derive(Debug, Default)]
pub struct MembershipCache {
    /// Room ID → room (authoritative copy while attached).
    rooms: HashMap<RoomId, Room>,
    /// User ID → rooms containing them (reverse index).
    rooms_by_user: HashMap<UserId, HashSet<RoomId>>,
    /// Room ID → currently-online member IDs.
    online: HashMap<RoomId, HashSet<UserId>>,
}

impl MembershipCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a room, rebuilding its snapshot and reverse index.
    ///
    /// Also used to refresh a room after its member list changed.
    pub fn attach_room(&mut self, room: Room, presence: &PresenceRegistry) {
        // Drop stale reverse-index entries from a previous member list.
        if let Some(previous) = self.rooms.get(&room.id) {
            for member in &previous.members {
                if let Some(set) = self.rooms_by_user.get_mut(&member.user_id) {
                    set.remove(&room.id);
                    if set.is_empty() {
                        self.rooms_by_user.remove(&member.user_id);
                    }
                }
            }
        }

        let snapshot: HashSet<UserId> = room
            .members
            .iter()
            .map(|m| m.user_id)
            .filter(|id| presence.is_online(*id))
            .collect();

        for member in &room.members {
            self.rooms_by_user
                .entry(member.user_id)
                .or_default()
                .insert(room.id);
        }

        self.online.insert(room.id, snapshot);
        self.rooms.insert(room.id, room);
    }

    /// Detach a room, dropping its snapshot and index entries.
    pub fn detach_room(&mut self, room_id: RoomId) -> Option<Room> {
        let room = self.rooms.remove(&room_id)?;
        self.online.remove(&room_id);
        for member in &room.members {
            if let Some(set) = self.rooms_by_user.get_mut(&member.user_id) {
                set.remove(&room_id);
                if set.is_empty() {
                    self.rooms_by_user.remove(&member.user_id);
                }
            }
        }
        Some(room)
    }

    /// Apply a presence flip.
    ///
    /// Updates the snapshot of every attached room containing the user
    /// and returns `(room, new snapshot)` for each room that changed,
    /// for broadcast to its connected members.
    pub fn on_user_online_changed(
        &mut self,
        user_id: UserId,
        is_online: bool,
    ) -> Vec<(RoomId, Vec<UserId>)> {
        let Some(room_ids) = self.rooms_by_user.get(&user_id) else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        for room_id in room_ids {
            let Some(snapshot) = self.online.get_mut(room_id) else {
                continue;
            };
            let flipped = if is_online {
                snapshot.insert(user_id)
            } else {
                snapshot.remove(&user_id)
            };
            if flipped {
                let mut members: Vec<UserId> = snapshot.iter().copied().collect();
                members.sort_unstable_by_key(|id| id.0);
                changed.push((*room_id, members));
            }
        }
        changed
    }

    /// Current online members of a room, sorted for stable output.
    pub fn online_members(&self, room_id: RoomId) -> Option<Vec<UserId>> {
        self.online.get(&room_id).map(|set| {
            let mut members: Vec<UserId> = set.iter().copied().collect();
            members.sort_unstable_by_key(|id| id.0);
            members
        })
    }

    /// Look up an attached room.
    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// Whether a room is attached.
    pub fn is_attached(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Number of attached rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
