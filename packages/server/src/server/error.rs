//! Mapping from domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domains::auth::OtpError;
use crate::domains::rooms::{InviteError, RoomError};

/// Error returned by every handler; renders as `{ "error", "message" }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "A valid bearer token is required",
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests, try again later",
        )
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
    }

    fn unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_UNAVAILABLE",
            "Service temporarily unavailable, try again",
        )
    }
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        let message = e.to_string();
        match e {
            OtpError::NotFound => Self::new(StatusCode::NOT_FOUND, "OTP_NOT_FOUND", message),
            OtpError::Expired => Self::new(StatusCode::GONE, "OTP_EXPIRED", message),
            OtpError::AttemptsExceeded => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, "OTP_ATTEMPTS_EXCEEDED", message)
            }
            OtpError::Mismatch { .. } => {
                Self::new(StatusCode::UNAUTHORIZED, "OTP_MISMATCH", message)
            }
            OtpError::StoreUnavailable => Self::unavailable(),
        }
    }
}

impl From<InviteError> for ApiError {
    fn from(e: InviteError) -> Self {
        let message = e.to_string();
        match e {
            InviteError::NotFound => Self::new(StatusCode::NOT_FOUND, "INVITE_NOT_FOUND", message),
            InviteError::RoomNotFound => {
                Self::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", message)
            }
            InviteError::InvalidStatus(_) => {
                Self::new(StatusCode::CONFLICT, "INVITE_INVALID_STATUS", message)
            }
            InviteError::Expired => Self::new(StatusCode::GONE, "INVITE_EXPIRED", message),
            InviteError::StoreUnavailable => Self::unavailable(),
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        let message = e.to_string();
        match e {
            RoomError::NotFound => Self::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", message),
            RoomError::NotAMember => Self::new(StatusCode::FORBIDDEN, "NOT_A_MEMBER", message),
            RoomError::StoreUnavailable => Self::unavailable(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(otp) = e.downcast_ref::<OtpError>() {
            return otp.clone().into();
        }
        if let Some(invite) = e.downcast_ref::<InviteError>() {
            return invite.clone().into();
        }
        if let Some(room) = e.downcast_ref::<RoomError>() {
            return room.clone().into();
        }
        error!(error = %e, "Unhandled error in request");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
