use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Number of digits in an issued code
pub const OTP_LENGTH: usize = 6;

/// OtpRecord - the live passcode for one subject
///
/// Persisted as JSON under `otp:<subject>` with a store TTL equal to the
/// time left until `expires_at`. At most one record exists per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: String,
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(code: String, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            code,
            attempts: 0,
            expires_at: now + window,
            created_at: now,
        }
    }

    /// Store key for a subject's record
    pub fn key(subject: &str) -> String {
        format!("otp:{}", subject)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before `expires_at`, zero once it has passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Compare a submitted code without short-circuiting on the first
    /// differing byte.
    pub fn matches(&self, submitted: &str) -> bool {
        self.code.as_bytes().ct_eq(submitted.as_bytes()).into()
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Generate a zero-padded numeric code, uniform over every 6-digit value.
///
/// `rand::rng()` is a CSPRNG reseeded from the OS.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

/// Submitted codes must be exactly six ASCII digits.
pub fn is_valid_otp_format(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}
