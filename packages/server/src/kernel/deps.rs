//! Server dependencies (using traits for testability)
//!
//! Central container handed to actions and HTTP handlers. External services
//! sit behind the Base* traits so tests can swap in the doubles from
//! `test_dependencies`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use twilio::TwilioService;

use crate::domains::auth::models::mask_phone;
use crate::domains::auth::{JwtService, OtpService, OtpSettings};
use crate::domains::rooms::{InviteService, InviteSettings, RoomService};
use crate::kernel::{BaseClock, BaseKeyValueStore, BaseSmsService};

// =============================================================================
// TwilioService Adapter (implements BaseSmsService trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseSmsService
pub struct TwilioAdapter {
    service: Arc<TwilioService>,
    /// Quoted in the OTP message body
    otp_expiry_minutes: i64,
}

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>, otp_expiry_minutes: i64) -> Self {
        Self {
            service,
            otp_expiry_minutes,
        }
    }
}

#[async_trait]
impl BaseSmsService for TwilioAdapter {
    async fn send_otp(&self, phone_number: &str, code: &str) -> Result<()> {
        let body = format!(
            "Your verification code is: {}. This code will expire in {} minutes.",
            code, self.otp_expiry_minutes
        );
        self.service
            .send_sms(phone_number, &body)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn send_invite(&self, phone_number: &str, invite_link: &str) -> Result<()> {
        let body = format!(
            "You've been invited to join a room! Click here to accept: {}",
            invite_link
        );
        self.service
            .send_sms(phone_number, &body)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

// =============================================================================
// Development SMS sink
// =============================================================================

/// Used when no Twilio sender is configured: messages go to the log.
pub struct LoggingSmsService;

#[async_trait]
impl BaseSmsService for LoggingSmsService {
    async fn send_otp(&self, phone_number: &str, code: &str) -> Result<()> {
        info!(phone = %mask_phone(phone_number), code = %code, "SMS OTP (development mode)");
        Ok(())
    }

    async fn send_invite(&self, phone_number: &str, invite_link: &str) -> Result<()> {
        info!(phone = %mask_phone(phone_number), link = %invite_link, "Invite SMS (development mode)");
        Ok(())
    }
}

// =============================================================================
// System clock
// =============================================================================

pub struct SystemClock;

impl BaseClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub kv_store: Arc<dyn BaseKeyValueStore>,
    pub sms: Arc<dyn BaseSmsService>,
    pub jwt_service: Arc<JwtService>,
    pub otp: Arc<OtpService>,
    pub rooms: Arc<RoomService>,
    pub invites: Arc<InviteService>,
    /// Salt for phone-number hashes in the users table
    pub phone_hash_salt: String,
}

impl ServerDeps {
    /// Wire the engines onto the given infrastructure
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        kv_store: Arc<dyn BaseKeyValueStore>,
        sms: Arc<dyn BaseSmsService>,
        clock: Arc<dyn BaseClock>,
        jwt_service: Arc<JwtService>,
        otp_settings: OtpSettings,
        invite_settings: InviteSettings,
        phone_hash_salt: String,
    ) -> Self {
        let otp = Arc::new(OtpService::new(
            kv_store.clone(),
            clock.clone(),
            otp_settings,
        ));
        let rooms = Arc::new(RoomService::new(
            db_pool.clone(),
            invite_settings.store_timeout,
        ));
        let invites = Arc::new(InviteService::new(
            db_pool.clone(),
            clock,
            invite_settings,
        ));

        Self {
            db_pool,
            kv_store,
            sms,
            jwt_service,
            otp,
            rooms,
            invites,
            phone_hash_salt,
        }
    }
}
