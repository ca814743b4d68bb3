//! Auth domain - phone-based one-time passcodes
//!
//! Responsibilities:
//! - OTP issuance, rate limiting and verification (`OtpService`)
//! - Phone normalization and hashing
//! - Users keyed by phone hash
//! - Session JWT issuance after verification

pub mod actions;
pub mod errors;
pub mod jwt;
pub mod models;
pub mod otp;
pub mod rate_limit;

pub use errors::OtpError;
pub use jwt::{Claims, JwtService};
pub use otp::{OtpService, OtpSettings};
pub use rate_limit::RateLimiter;
