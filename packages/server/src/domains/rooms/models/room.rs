use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::common::{RoomId, UserId};

/// Role a member holds in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "room_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomRole {
    Landlord,
    Tenant,
}

impl std::fmt::Display for RoomRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomRole::Landlord => write!(f, "LANDLORD"),
            RoomRole::Tenant => write!(f, "TENANT"),
        }
    }
}

/// Room - a group that users join through invites
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub owner_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Room Queries
// =============================================================================

impl Room {
    pub async fn insert<'e>(
        name: &str,
        owner_user_id: UserId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (id, name, owner_user_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(RoomId::new())
        .bind(name)
        .bind(owner_user_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        id: RoomId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Rooms the user belongs to, newest first
    pub async fn find_for_user<'e>(
        user_id: UserId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Room>(
            r#"
            SELECT r.*
            FROM rooms r
            INNER JOIN room_memberships rm ON r.id = rm.room_id
            WHERE rm.user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}
