//! Verify OTP action

use anyhow::Result;
use tracing::info;

use crate::common::UserId;
use crate::domains::auth::models::{hash_phone_number, User};
use crate::kernel::ServerDeps;

/// Successful verification: the user and a fresh session token
#[derive(Debug, Clone)]
pub struct OtpVerified {
    pub user_id: UserId,
    pub phone_number: String,
    pub token: String,
}

/// Verify a code for an already-normalized phone number, then find or
/// create the user and mint a session token.
///
/// `OtpError` values propagate unchanged inside the `anyhow::Error` so the
/// HTTP layer can map them.
pub async fn verify_otp(phone_number: &str, code: &str, deps: &ServerDeps) -> Result<OtpVerified> {
    deps.otp.verify(phone_number, code).await?;

    let phone_hash = hash_phone_number(phone_number, &deps.phone_hash_salt);
    let user = User::find_or_create(phone_number, &phone_hash, &deps.db_pool).await?;
    let token = deps
        .jwt_service
        .create_token(user.id, phone_number.to_string())?;

    info!(user_id = %user.id, "OTP verified, session issued");
    Ok(OtpVerified {
        user_id: user.id,
        phone_number: phone_number.to_string(),
        token,
    })
}
