//! Chat room domain models.

pub mod kind;
pub mod member;
pub mod model;

pub use kind::RoomKind;
pub use member::{MemberRole, RoomMember};
pub use model::Room;
