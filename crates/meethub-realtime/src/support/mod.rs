//! Support ticket assignment.

pub mod desk;

pub use desk::SupportDesk;
