//! Presence registry — maps live sessions to user identities.
//!
//! A user is online iff at least one session maps to them. The registry
//! is owned exclusively by the hub; it never calls out to storage and
//! cannot fail except on invalid input, which is a no-op.

use std::collections::{HashMap, HashSet};

use meethub_core::types::id::UserId;

use crate::connection::handle::ConnectionId;

/// Tracks which users are connected from which sessions.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Session → user.
    sessions: HashMap<ConnectionId, UserId>,
    /// User → sessions (reverse index).
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session → user mapping.
    ///
    /// Idempotent for the same session. Returns `true` if this was the
    /// user's first active session (the user just became online).
    pub fn register_session(&mut self, session_id: ConnectionId, user_id: UserId) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, user_id);
        let sessions = self.by_user.entry(user_id).or_default();
        sessions.insert(session_id);
        sessions.len() == 1
    }

    /// Remove a session mapping.
    ///
    /// Returns the user and whether this was their last session (the
    /// user just became offline). Unknown sessions return `None`;
    /// duplicate disconnect events are expected and harmless.
    pub fn unregister_session(&mut self, session_id: ConnectionId) -> Option<(UserId, bool)> {
        let user_id = self.sessions.remove(&session_id)?;
        let became_offline = match self.by_user.get_mut(&user_id) {
            Some(sessions) => {
                sessions.remove(&session_id);
                if sessions.is_empty() {
                    self.by_user.remove(&user_id);
                    true
                } else {
                    false
                }
            }
            None => true,
        };
        Some((user_id, became_offline))
    }

    /// Check whether a user has at least one live session.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// All currently online users.
    pub fn online_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.by_user.keys().copied()
    }

    /// Number of live sessions for a user.
    pub fn session_count(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Total number of live sessions.
    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }
}
