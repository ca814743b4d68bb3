use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use super::RoomRole;
use crate::common::{MembershipId, RoomId, UserId};

/// Membership - a user's role within a room
///
/// Rows are never updated. At most one exists per (room_id, user_id),
/// enforced by a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: MembershipId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: RoomRole,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Membership Queries
// =============================================================================

impl Membership {
    pub async fn find<'e>(
        room_id: RoomId,
        user_id: UserId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM room_memberships WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Insert unless a row for (room, user) already exists.
    ///
    /// Returns `None` on a uniqueness collision instead of raising, so the
    /// surrounding transaction stays usable.
    pub async fn insert_if_absent<'e>(
        room_id: RoomId,
        user_id: UserId,
        role: RoomRole,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO room_memberships (id, room_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (room_id, user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(MembershipId::new())
        .bind(room_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    pub async fn count_for_room<'e>(
        room_id: RoomId,
        executor: impl PgExecutor<'e>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_memberships WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(executor)
            .await
    }
}
