//! Support ticket lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a support ticket.
///
/// Reassignment is a transition, not a resting state: a ticket whose
/// deadline expires moves straight back to `Assigned` (next admin) or
/// `Pending` (no admin online).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Waiting for an admin; no one assigned yet.
    Pending,
    /// An admin has been offered the ticket and has a response deadline.
    Assigned,
    /// The assigned admin has responded; conversation in progress.
    Active,
    /// Resolved or abandoned; retained only as closed room state.
    Closed,
}

impl TicketState {
    /// Whether the ticket still needs attention (not closed).
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Whether the ticket currently has a response deadline armed.
    pub fn has_deadline(&self) -> bool {
        matches!(self, Self::Assigned)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_states() {
        assert!(TicketState::Pending.is_unresolved());
        assert!(TicketState::Assigned.is_unresolved());
        assert!(TicketState::Active.is_unresolved());
        assert!(!TicketState::Closed.is_unresolved());
    }

    #[test]
    fn test_only_assigned_has_deadline() {
        assert!(TicketState::Assigned.has_deadline());
        assert!(!TicketState::Pending.has_deadline());
        assert!(!TicketState::Active.has_deadline());
    }
}
