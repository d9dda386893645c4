//! Support ticket domain models.

pub mod model;
pub mod state;

pub use model::SupportTicket;
pub use state::TicketState;
