//! Chat message domain models.

pub mod model;

pub use model::{LastMessage, Message};
