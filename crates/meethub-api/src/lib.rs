//! # meethub-api
//!
//! HTTP boundary for MeetHub: the WebSocket upgrade endpoint and
//! health checks. All realtime traffic flows over the socket; there is
//! no HTTP CRUD surface here.

pub mod handlers;
pub mod router;
pub mod state;

pub use state::AppState;
