//! Unread message counters.

pub mod counters;

pub use counters::UnreadCounters;
