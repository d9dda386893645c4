//! Support ticket entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meethub_core::types::id::{RoomId, TicketId, UserId};

use super::state::TicketState;

/// One user's outstanding request for human help.
///
/// The assignment state machine in the realtime core drives all
/// transitions; this struct only holds the data and enforces the
/// field-level consistency of each transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    /// Unique ticket identifier.
    pub id: TicketId,
    /// The user requesting help.
    pub user_id: UserId,
    /// The support room backing this ticket.
    pub room_id: RoomId,
    /// The currently assigned admin, if any.
    pub admin_id: Option<UserId>,
    /// Current lifecycle state.
    pub state: TicketState,
    /// When the current admin was assigned.
    pub assigned_at: Option<DateTime<Utc>>,
    /// When the current response deadline expires.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Monotonic token identifying the current deadline.
    ///
    /// Bumped on every transition out of `Assigned`; a deadline event
    /// carrying a stale token is ignored.
    pub deadline_token: u64,
    /// The admin who most recently timed out, excluded from the next pick.
    pub last_timed_out_admin: Option<UserId>,
    /// Number of deadline-driven reassignments so far.
    pub reassign_count: u32,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
}

impl SupportTicket {
    /// Create a new pending ticket backed by the given support room.
    pub fn pending(user_id: UserId, room_id: RoomId) -> Self {
        Self {
            id: TicketId::new(),
            user_id,
            room_id,
            admin_id: None,
            state: TicketState::Pending,
            assigned_at: None,
            deadline_at: None,
            deadline_token: 0,
            last_timed_out_admin: None,
            reassign_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Assign an admin and arm a fresh deadline.
    ///
    /// Returns the new deadline token, which the caller must carry in the
    /// scheduled deadline event.
    pub fn assign(&mut self, admin_id: UserId, deadline_at: DateTime<Utc>) -> u64 {
        self.admin_id = Some(admin_id);
        self.state = TicketState::Assigned;
        self.assigned_at = Some(Utc::now());
        self.deadline_at = Some(deadline_at);
        self.deadline_token += 1;
        self.deadline_token
    }

    /// The assigned admin responded; disarm the deadline.
    pub fn activate(&mut self) {
        self.state = TicketState::Active;
        self.deadline_at = None;
        self.deadline_token += 1;
        self.last_timed_out_admin = None;
    }

    /// The deadline fired; drop the admin and record the timeout.
    ///
    /// Leaves the ticket in `Pending`; the caller immediately re-runs the
    /// assignment algorithm, which either assigns a different admin or
    /// leaves the ticket pending.
    pub fn timed_out(&mut self) -> Option<UserId> {
        let expired_admin = self.admin_id.take();
        self.state = TicketState::Pending;
        self.assigned_at = None;
        self.deadline_at = None;
        self.deadline_token += 1;
        self.last_timed_out_admin = expired_admin;
        self.reassign_count += 1;
        expired_admin
    }

    /// Close the ticket.
    pub fn close(&mut self) {
        self.state = TicketState::Closed;
        self.deadline_at = None;
        self.deadline_token += 1;
    }

    /// Whether a deadline event with the given token is still current.
    pub fn deadline_is_current(&self, token: u64) -> bool {
        self.state == TicketState::Assigned && self.deadline_token == token
    }
}
