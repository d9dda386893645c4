//! Room membership entry.

use serde::{Deserialize, Serialize};

use meethub_core::types::id::UserId;

/// Role of a user within a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// The designated admin of the room (support rooms have at most one).
    Admin,
    /// Ordinary room member.
    Member,
}

/// One entry in a room's ordered member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    /// The user.
    pub user_id: UserId,
    /// The user's role within this room.
    pub role: MemberRole,
}

impl RoomMember {
    /// Create a regular member entry.
    pub fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            role: MemberRole::Member,
        }
    }

    /// Create an admin member entry.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: MemberRole::Admin,
        }
    }
}
