//! Rooms domain - rooms, memberships and invites
//!
//! Responsibilities:
//! - Room creation with the creator's membership (`RoomService`)
//! - Invite creation and transactional acceptance (`InviteService`)

pub mod actions;
pub mod errors;
pub mod invite;
pub mod models;
pub mod room;

pub use errors::{InviteError, RoomError};
pub use invite::{AcceptedInvite, InviteService, InviteSettings};
pub use room::RoomService;
