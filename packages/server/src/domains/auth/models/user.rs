use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::UserId;

/// User - one per verified phone number
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub phone_e164: String,
    pub phone_hash: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl User {
    /// Return the user for this phone hash, creating it on first sight.
    ///
    /// Two first-time verifications racing on the same phone converge on
    /// one row through the unique index on `phone_hash`.
    pub async fn find_or_create(
        phone_e164: &str,
        phone_hash: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, phone_e164, phone_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (phone_hash) DO UPDATE SET phone_e164 = EXCLUDED.phone_e164
            RETURNING *
            "#,
        )
        .bind(UserId::new())
        .bind(phone_e164)
        .bind(phone_hash)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }
}
