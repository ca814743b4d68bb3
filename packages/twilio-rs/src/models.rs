use serde::{Deserialize, Serialize};

/// Message resource returned by `POST /Messages.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
    pub to: String,
    pub from: Option<String>,
    pub date_created: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

impl MessageResponse {
    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "undelivered")
    }
}

/// Error body Twilio returns with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageErrorResponse {
    pub code: Option<i64>,
    pub message: String,
    pub status: Option<u16>,
}
