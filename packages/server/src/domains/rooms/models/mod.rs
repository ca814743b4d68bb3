pub mod invite;
pub mod membership;
pub mod room;

pub use invite::*;
pub use membership::*;
pub use room::*;
