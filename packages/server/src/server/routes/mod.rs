// HTTP routes
pub mod auth;
pub mod health;
pub mod invites;
pub mod rooms;

pub use auth::*;
pub use health::*;
pub use invites::*;
pub use rooms::*;
