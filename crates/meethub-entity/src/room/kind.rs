//! Room kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a chat room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// One-to-one conversation.
    Private,
    /// Multi-member conversation.
    Group,
    /// User-to-admin support conversation.
    Support,
}

impl RoomKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
