//! Wire message definitions for the gateway event channel.

pub mod types;

pub use types::{AdminProfile, AuthErrorCode, ClientEvent, ServerEvent, TicketCode};
