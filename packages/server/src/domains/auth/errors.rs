use thiserror::Error;
use tracing::warn;

use crate::kernel::StoreError;

/// Outcomes of OTP operations other than success.
///
/// Everything except `StoreUnavailable` is an expected business result that
/// the caller turns into a response. `StoreUnavailable` is transient and
/// left to the caller to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("OTP not found or already used")]
    NotFound,

    #[error("OTP expired")]
    Expired,

    #[error("max OTP attempts exceeded")]
    AttemptsExceeded,

    #[error("invalid OTP code")]
    Mismatch { attempts: u32 },

    #[error("OTP store unavailable")]
    StoreUnavailable,
}

impl From<StoreError> for OtpError {
    fn from(e: StoreError) -> Self {
        warn!(error = %e, "OTP store call failed");
        OtpError::StoreUnavailable
    }
}
