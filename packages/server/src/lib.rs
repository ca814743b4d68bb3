// Roomkey - API Core
//
// Phone-number sign-in with one-time passcodes, and rooms that users join
// by accepting invites sent to their phones.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
