use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::auth::OtpSettings;
use crate::domains::rooms::InviteSettings;

/// Twilio credentials; all three must be present to send real SMS
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub phone_hash_salt: String,
    /// None means development mode: SMS bodies are logged instead of sent
    pub twilio: Option<TwilioConfig>,
    pub otp_expiry_minutes: i64,
    pub max_otp_attempts: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: i64,
    pub store_timeout_ms: u64,
    pub invite_expiry_days: i64,
    pub invite_base_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID").ok(),
            env::var("TWILIO_AUTH_TOKEN").ok(),
            env::var("TWILIO_FROM_NUMBER").ok(),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            port: parse_or("PORT", 8080)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "roomkey".to_string()),
            phone_hash_salt: env::var("PHONE_HASH_SALT")
                .context("PHONE_HASH_SALT must be set")?,
            twilio,
            otp_expiry_minutes: parse_or("OTP_EXPIRY_MINUTES", 5)?,
            max_otp_attempts: parse_or("MAX_OTP_ATTEMPTS", 5)?,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW", 60)?,
            rate_limit_max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 10)?,
            store_timeout_ms: parse_or("STORE_TIMEOUT_MS", 2000)?,
            invite_expiry_days: parse_or("INVITE_EXPIRY_DAYS", 7)?,
            invite_base_url: env::var("INVITE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/invite".to_string()),
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn otp_settings(&self) -> OtpSettings {
        OtpSettings::builder()
            .max_attempts(self.max_otp_attempts)
            .otp_window(chrono::Duration::minutes(self.otp_expiry_minutes))
            .rate_window(Duration::from_secs(self.rate_limit_window_secs))
            .rate_threshold(self.rate_limit_max_requests)
            .store_timeout(self.store_timeout())
            .build()
    }

    pub fn invite_settings(&self) -> InviteSettings {
        InviteSettings::builder()
            .expiry(chrono::Duration::days(self.invite_expiry_days))
            .base_url(self.invite_base_url.clone())
            .store_timeout(self.store_timeout())
            .build()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
