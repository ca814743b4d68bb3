pub mod otp_record;
pub mod phone;
pub mod user;

pub use otp_record::*;
pub use phone::*;
pub use user::*;
