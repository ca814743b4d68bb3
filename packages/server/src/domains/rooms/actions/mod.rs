pub mod send_invite;

pub use send_invite::send_invite;
