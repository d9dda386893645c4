//! # meethub-store
//!
//! Storage collaborator seam for MeetHub. The realtime core reaches
//! persistent storage only through the narrow traits defined here
//! (`find`, `save`, `update` — nothing richer). The in-memory
//! implementation backs the server binary and the test suites.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{MessageStore, RoomStore, UserStore};
