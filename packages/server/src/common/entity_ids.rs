//! Typed ID definitions for the persisted entities.

pub use super::id::{Id, V4, V7};

/// Marker type for users (one per verified phone number).
pub struct User;

/// Marker type for rooms.
pub struct Room;

/// Marker type for room memberships.
pub struct RoomMembership;

/// Marker type for invites.
pub struct Invite;

pub type UserId = Id<User>;

pub type RoomId = Id<Room>;

pub type MembershipId = Id<RoomMembership>;

pub type InviteId = Id<Invite>;
