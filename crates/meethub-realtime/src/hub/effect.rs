//! Effects produced by hub state transitions.
//!
//! `HubState::apply` returns these instead of performing I/O so that
//! every transition commits fully before any delivery, timer, or
//! write-behind happens — and so the state machine stays directly
//! testable.

use std::time::Duration;

use meethub_core::types::id::{TicketId, UserId};
use meethub_entity::message::Message;
use meethub_entity::room::Room;

use crate::connection::handle::ConnectionId;
use crate::message::types::ServerEvent;

/// A side effect requested by a committed state transition.
#[derive(Debug)]
pub enum Effect {
    /// Deliver an event to one connection.
    ToConn(ConnectionId, ServerEvent),
    /// Deliver an event to every connection of one user.
    ToUser(UserId, ServerEvent),
    /// Deliver an event to every connection of each listed user.
    ToUsers(Vec<UserId>, ServerEvent),
    /// Arm a response deadline for a ticket.
    ///
    /// The driver sleeps for `after` and then feeds
    /// [`HubCommand::SupportDeadlineElapsed`] back into the mailbox
    /// carrying the same token.
    ///
    /// [`HubCommand::SupportDeadlineElapsed`]: crate::hub::command::HubCommand::SupportDeadlineElapsed
    ScheduleDeadline {
        /// The ticket.
        ticket_id: TicketId,
        /// Token identifying this deadline.
        token: u64,
        /// How long until the deadline fires.
        after: Duration,
    },
    /// Persist a room via the storage collaborator (write-behind).
    PersistRoom(Room),
    /// Persist a message via the storage collaborator (write-behind).
    PersistMessage(Message),
}
