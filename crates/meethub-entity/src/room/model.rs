//! Chat room entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meethub_core::types::id::{MessageId, RoomId, UserId};

use crate::message::LastMessage;

use super::kind::RoomKind;
use super::member::{MemberRole, RoomMember};

/// A chat room.
///
/// Rooms are persisted by the storage collaborator. The realtime core
/// loads them to resolve membership and keeps the last-message summary
/// current as messages flow through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Room kind.
    pub kind: RoomKind,
    /// Ordered member list.
    pub members: Vec<RoomMember>,
    /// Summary of the most recent message, if any.
    pub last_message: Option<LastMessage>,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
    /// When the room was soft-deleted, if it has been.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Create a new room with the given members.
    pub fn new(name: impl Into<String>, kind: RoomKind, members: Vec<RoomMember>) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            kind,
            members,
            last_message: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Create a support room with the requesting user as sole member.
    pub fn support(name: impl Into<String>, user_id: UserId) -> Self {
        Self::new(name, RoomKind::Support, vec![RoomMember::member(user_id)])
    }

    /// All member user IDs, in member-list order.
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    /// Check whether a user is a member of this room.
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// The designated admin of a support room, if one is assigned.
    pub fn support_admin(&self) -> Option<UserId> {
        self.members
            .iter()
            .find(|m| m.role == MemberRole::Admin)
            .map(|m| m.user_id)
    }

    /// Add a member; no-op if the user is already in the room.
    pub fn add_member(&mut self, member: RoomMember) {
        if !self.is_member(member.user_id) {
            self.members.push(member);
        }
    }

    /// Remove a member; no-op if the user is not in the room.
    pub fn remove_member(&mut self, user_id: UserId) {
        self.members.retain(|m| m.user_id != user_id);
    }

    /// Replace the designated admin of a support room.
    ///
    /// Removes any current admin entry and appends the new one.
    pub fn set_support_admin(&mut self, admin_id: UserId) {
        self.members.retain(|m| m.role != MemberRole::Admin);
        self.members.push(RoomMember::admin(admin_id));
    }

    /// Record the most recent message summary.
    pub fn touch_last_message(
        &mut self,
        message_id: MessageId,
        sender_id: UserId,
        text: &str,
        sent_at: DateTime<Utc>,
    ) {
        self.last_message = Some(LastMessage::from_text(message_id, sender_id, text, sent_at));
    }

    /// Check whether the room has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Soft-delete the room.
    pub fn mark_deleted(&mut self) {
        self.deleted_at = Some(Utc::now());
    }
}
