//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meethub_core::types::id::UserId;

use super::role::UserRole;

/// A MeetHub user account.
///
/// User records are owned by the storage collaborator; the realtime core
/// reads them for display names and role checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Role in the platform.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record.
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role,
            created_at: Utc::now(),
        }
    }
}
