//! Send OTP action

use anyhow::Result;
use tracing::{error, info, warn};

use crate::domains::auth::models::mask_phone;
use crate::kernel::ServerDeps;

/// Result of requesting a code
#[derive(Debug, PartialEq, Eq)]
pub enum SendOtpResult {
    Sent,
    RateLimited,
}

/// Issue a code for an already-normalized phone number and text it.
///
/// Order: rate check, issue, deliver, then count the request. A failed
/// delivery therefore does not consume rate budget, and a code stored
/// before a failed delivery stays live until replaced or expired.
pub async fn send_otp(phone_number: &str, deps: &ServerDeps) -> Result<SendOtpResult> {
    let masked = mask_phone(phone_number);

    if deps.otp.is_rate_limited(phone_number).await? {
        info!(phone = %masked, "OTP request rate limited");
        return Ok(SendOtpResult::RateLimited);
    }

    let code = deps.otp.issue(phone_number).await?;

    deps.sms.send_otp(phone_number, &code).await.map_err(|e| {
        error!(phone = %masked, error = %e, "Failed to send OTP");
        anyhow::anyhow!("Failed to send OTP: {}", e)
    })?;

    // The code is already out; a counter hiccup should not fail the request.
    if let Err(e) = deps.otp.increment_rate_limit(phone_number).await {
        warn!(phone = %masked, error = %e, "Failed to increment rate limit");
    }

    info!(phone = %masked, "OTP sent");
    Ok(SendOtpResult::Sent)
}
