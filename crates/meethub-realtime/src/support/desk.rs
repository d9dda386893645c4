//! Support desk — the ticket table and admin selection policy.
//!
//! Holds every unresolved ticket plus the indexes the state machine
//! needs: by room (claims, closes, messages) and by user (duplicate
//! guard). Admin selection is least-recently-assigned among online
//! admins, with the admin who just timed out excluded from the pick.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use meethub_core::types::id::{RoomId, TicketId, UserId};
use meethub_entity::ticket::SupportTicket;

/// Ticket table with lookup indexes and assignment recency.
#[derive(Debug, Default)]
pub struct SupportDesk {
    /// Ticket ID → ticket.
    tickets: HashMap<TicketId, SupportTicket>,
    /// Support room → ticket.
    by_room: HashMap<RoomId, TicketId>,
    /// Requesting user → their unresolved ticket.
    by_user: HashMap<UserId, TicketId>,
    /// Admin → when they were last handed a ticket.
    last_assigned: HashMap<UserId, DateTime<Utc>>,
}

impl SupportDesk {
    /// Create an empty desk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new ticket and index it.
    pub fn insert(&mut self, ticket: SupportTicket) {
        self.by_room.insert(ticket.room_id, ticket.id);
        self.by_user.insert(ticket.user_id, ticket.id);
        self.tickets.insert(ticket.id, ticket);
    }

    /// The user's unresolved ticket, if they have one.
    pub fn unresolved_for_user(&self, user_id: UserId) -> Option<&SupportTicket> {
        self.by_user
            .get(&user_id)
            .and_then(|id| self.tickets.get(id))
    }

    /// The ticket backing a support room.
    pub fn ticket_for_room(&self, room_id: RoomId) -> Option<&SupportTicket> {
        self.by_room
            .get(&room_id)
            .and_then(|id| self.tickets.get(id))
    }

    /// Mutable ticket lookup by room.
    pub fn ticket_for_room_mut(&mut self, room_id: RoomId) -> Option<&mut SupportTicket> {
        let id = *self.by_room.get(&room_id)?;
        self.tickets.get_mut(&id)
    }

    /// Mutable ticket lookup by id.
    pub fn get_mut(&mut self, ticket_id: TicketId) -> Option<&mut SupportTicket> {
        self.tickets.get_mut(&ticket_id)
    }

    /// Remove a closed ticket from the table and all indexes.
    pub fn remove(&mut self, ticket_id: TicketId) -> Option<SupportTicket> {
        let ticket = self.tickets.remove(&ticket_id)?;
        self.by_room.remove(&ticket.room_id);
        self.by_user.remove(&ticket.user_id);
        Some(ticket)
    }

    /// Record that an admin was just handed a ticket.
    pub fn note_assignment(&mut self, admin_id: UserId) {
        self.last_assigned.insert(admin_id, Utc::now());
    }

    /// Pick the least-recently-assigned admin from the candidates.
    ///
    /// Admins who have never been assigned sort first; ties break on
    /// the admin's ID so selection is deterministic. `exclude` removes
    /// the admin who just timed out from consideration.
    pub fn pick_admin(&self, candidates: &[UserId], exclude: Option<UserId>) -> Option<UserId> {
        candidates
            .iter()
            .copied()
            .filter(|id| Some(*id) != exclude)
            .min_by_key(|id| {
                (
                    self.last_assigned
                        .get(id)
                        .copied()
                        .unwrap_or(DateTime::<Utc>::MIN_UTC),
                    id.0,
                )
            })
    }

    /// Number of unresolved tickets.
    pub fn open_tickets(&self) -> usize {
        self.tickets.len()
    }
}
