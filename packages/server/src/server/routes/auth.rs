//! OTP sign-in endpoints.

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::UserId;
use crate::domains::auth::actions::{send_otp, verify_otp, SendOtpResult};
use crate::domains::auth::models::{is_valid_otp_format, normalize_phone};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::extract::ApiJson;
use crate::server::middleware::ClientIp;

#[derive(Deserialize)]
pub struct StartOtpRequest {
    #[serde(alias = "phone_number")]
    pub phone: String,
}

#[derive(Serialize)]
pub struct StartOtpResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(alias = "phone_number")]
    pub phone: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub token: String,
    pub user_id: UserId,
    pub phone_number: String,
}

/// POST /auth/otp/start
pub async fn start_otp_handler(
    Extension(state): Extension<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    ApiJson(body): ApiJson<StartOtpRequest>,
) -> Result<Json<StartOtpResponse>, ApiError> {
    let phone = normalize_phone(&body.phone)
        .ok_or_else(|| ApiError::bad_request("Invalid phone number"))?;

    if let Some(Extension(ClientIp(ip))) = client_ip {
        info!(client_ip = %ip, "OTP requested");
    }

    match send_otp(&phone, &state.deps).await? {
        SendOtpResult::Sent => Ok(Json(StartOtpResponse {
            success: true,
            message: "Verification code sent".to_string(),
        })),
        SendOtpResult::RateLimited => Err(ApiError::rate_limited()),
    }
}

/// POST /auth/otp/verify
pub async fn verify_otp_handler(
    Extension(state): Extension<AppState>,
    ApiJson(body): ApiJson<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let phone = normalize_phone(&body.phone)
        .ok_or_else(|| ApiError::bad_request("Invalid phone number"))?;
    let code = body.code.trim();
    if !is_valid_otp_format(code) {
        return Err(ApiError::bad_request("Code must be 6 digits"));
    }

    let verified = verify_otp(&phone, code, &state.deps).await?;

    Ok(Json(VerifyOtpResponse {
        token: verified.token,
        user_id: verified.user_id,
        phone_number: verified.phone_number,
    }))
}
