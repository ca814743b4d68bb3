use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use super::RoomRole;
use crate::common::{InviteId, RoomId, UserId};

/// Invite lifecycle. Only PENDING moves, and only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invite_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InviteStatus::Pending => write!(f, "PENDING"),
            InviteStatus::Accepted => write!(f, "ACCEPTED"),
            InviteStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Invite - a standing offer to join a room with a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    pub id: InviteId,
    pub room_id: RoomId,
    pub phone_e164: String,
    pub role: RoomRole,
    /// Bearer credential; unique and never rewritten
    #[serde(skip_serializing)]
    pub token: String,
    pub status: InviteStatus,
    pub invited_by_user_id: UserId,
    pub accepted_by_user_id: Option<UserId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// 256 bits from the thread CSPRNG, URL-safe base64 without padding.
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

impl Invite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// =============================================================================
// Invite Queries
// =============================================================================

impl Invite {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e>(
        room_id: RoomId,
        phone_e164: &str,
        role: RoomRole,
        token: &str,
        invited_by_user_id: UserId,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO invites
                (id, room_id, phone_e164, role, token, status, invited_by_user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(InviteId::new())
        .bind(room_id)
        .bind(phone_e164)
        .bind(role)
        .bind(token)
        .bind(invited_by_user_id)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_token<'e>(
        token: &str,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE token = $1")
            .bind(token)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        id: InviteId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// PENDING -> EXPIRED. No-op for any other status.
    pub async fn mark_expired<'e>(
        id: InviteId,
        executor: impl PgExecutor<'e>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'EXPIRED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// PENDING -> ACCEPTED for `user_id`.
    ///
    /// Also matches a row this same user has already moved to ACCEPTED, so
    /// two racing submissions by one user both proceed. The row lock taken
    /// by the UPDATE serializes racing transactions; Postgres re-checks the
    /// WHERE clause against the committed row once the lock is released.
    pub async fn claim<'e>(
        id: InviteId,
        user_id: UserId,
        now: DateTime<Utc>,
        executor: impl PgExecutor<'e>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET status = 'ACCEPTED',
                accepted_by_user_id = $2,
                accepted_at = COALESCE(accepted_at, $3)
            WHERE id = $1
              AND (status = 'PENDING' OR (status = 'ACCEPTED' AND accepted_by_user_id = $2))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
