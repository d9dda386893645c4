//! # meethub-entity
//!
//! Domain entity models for MeetHub: users, chat rooms, messages,
//! and support tickets.

pub mod message;
pub mod room;
pub mod ticket;
pub mod user;

pub use room::{MemberRole, Room, RoomKind, RoomMember};
pub use ticket::{SupportTicket, TicketState};
pub use user::UserRole;
