//! Room engine: creation and membership lookups.

use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

use super::errors::RoomError;
use super::models::{Membership, Room, RoomRole};
use crate::common::{RoomId, UserId};
use crate::kernel::{begin_with_deadline, with_deadline};

pub struct RoomService {
    pool: PgPool,
    store_timeout: Duration,
}

impl RoomService {
    pub fn new(pool: PgPool, store_timeout: Duration) -> Self {
        Self {
            pool,
            store_timeout,
        }
    }

    /// Create a room and the creator's membership in one transaction.
    pub async fn create_room(
        &self,
        name: &str,
        creator: UserId,
        creator_role: RoomRole,
    ) -> Result<Room, RoomError> {
        let room = with_deadline(self.store_timeout, async {
            let mut tx = begin_with_deadline(&self.pool, self.store_timeout).await?;
            let room = Room::insert(name, creator, &mut *tx).await?;
            Membership::insert_if_absent(room.id, creator, creator_role, &mut *tx).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(room)
        })
        .await?;

        info!(room_id = %room.id, creator = %creator, role = %creator_role, "Room created");
        Ok(room)
    }

    pub async fn get_room(&self, room_id: RoomId) -> Result<Room, RoomError> {
        with_deadline(self.store_timeout, Room::find_by_id(room_id, &self.pool))
            .await?
            .ok_or(RoomError::NotFound)
    }

    /// Rooms the user is a member of, newest first.
    pub async fn list_rooms(&self, user_id: UserId) -> Result<Vec<Room>, RoomError> {
        Ok(with_deadline(self.store_timeout, Room::find_for_user(user_id, &self.pool)).await?)
    }

    pub async fn get_user_role_in_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<RoomRole, RoomError> {
        with_deadline(
            self.store_timeout,
            Membership::find(room_id, user_id, &self.pool),
        )
        .await?
        .map(|m| m.role)
        .ok_or(RoomError::NotAMember)
    }
}
