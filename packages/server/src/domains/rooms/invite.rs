//! Invite engine: create invites and accept them into memberships.
//!
//! ```text
//! PENDING --accept--------> ACCEPTED (+ membership)
//!    \-----accept late----> EXPIRED  (no membership)
//! ```
//!
//! Acceptance runs as one Postgres transaction. The status change and the
//! membership insert commit together or not at all, and a transaction that
//! is dropped part way (deadline, cancelled request) rolls back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use super::errors::InviteError;
use super::models::{generate_invite_token, Invite, InviteStatus, Membership, Room, RoomRole};
use crate::common::{RoomId, UserId};
use crate::kernel::{begin_with_deadline, with_deadline, BaseClock};

#[derive(Clone, Debug, TypedBuilder)]
pub struct InviteSettings {
    /// How long an invite stays acceptable
    #[builder(default = chrono::Duration::days(7))]
    pub expiry: chrono::Duration,
    /// Prefix of the link texted to the invitee
    #[builder(default = "http://localhost:3000/invite".to_string(), setter(into))]
    pub base_url: String,
    /// Deadline for a whole store operation, transaction included
    #[builder(default = Duration::from_secs(5))]
    pub store_timeout: Duration,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InviteSettings {
    pub fn invite_link(&self, token: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), token)
    }
}

/// Successful acceptance
#[derive(Debug, Clone)]
pub struct AcceptedInvite {
    pub membership: Membership,
    /// The user already held a membership in the room; nothing was inserted
    pub already_member: bool,
}

pub struct InviteService {
    pool: PgPool,
    clock: Arc<dyn BaseClock>,
    settings: InviteSettings,
}

impl InviteService {
    pub fn new(pool: PgPool, clock: Arc<dyn BaseClock>, settings: InviteSettings) -> Self {
        Self {
            pool,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &InviteSettings {
        &self.settings
    }

    /// Record a PENDING invite and return it with its fresh token.
    ///
    /// The inviter's own membership in the room is not checked here.
    pub async fn create_invite(
        &self,
        room_id: RoomId,
        phone_e164: &str,
        role: RoomRole,
        inviter: UserId,
    ) -> Result<Invite, InviteError> {
        let now = self.clock.now();
        let expires_at = now + self.settings.expiry;
        let token = generate_invite_token();

        let invite = with_deadline(
            self.settings.store_timeout,
            self.insert_for_existing_room(room_id, phone_e164, role, &token, inviter, expires_at, now),
        )
        .await?
        .ok_or(InviteError::RoomNotFound)?;

        info!(
            invite_id = %invite.id,
            room_id = %room_id,
            role = %role,
            invited_by = %inviter,
            "Invite created"
        );
        Ok(invite)
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_for_existing_room(
        &self,
        room_id: RoomId,
        phone_e164: &str,
        role: RoomRole,
        token: &str,
        inviter: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>, sqlx::Error> {
        if Room::find_by_id(room_id, &self.pool).await?.is_none() {
            return Ok(None);
        }
        let invite = Invite::insert(
            room_id, phone_e164, role, token, inviter, expires_at, now, &self.pool,
        )
        .await?;
        Ok(Some(invite))
    }

    pub async fn get_invite_by_token(&self, token: &str) -> Result<Invite, InviteError> {
        with_deadline(
            self.settings.store_timeout,
            Invite::find_by_token(token, &self.pool),
        )
        .await?
        .ok_or(InviteError::NotFound)
    }

    /// Accept the invite identified by `token` on behalf of `user_id`.
    ///
    /// Concurrent submissions by the same user both succeed and leave one
    /// membership. Of concurrent submissions by different users exactly one
    /// wins; the rest see `InvalidStatus(Accepted)`. A later resubmission,
    /// even by the winner, is `InvalidStatus` as well.
    pub async fn accept_invite(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<AcceptedInvite, InviteError> {
        let now = self.clock.now();
        match tokio::time::timeout(
            self.settings.store_timeout,
            self.accept_in_transaction(token, user_id, now),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    user_id = %user_id,
                    deadline = ?self.settings.store_timeout,
                    "Invite acceptance exceeded deadline, rolled back"
                );
                Err(InviteError::StoreUnavailable)
            }
        }
    }

    async fn accept_in_transaction(
        &self,
        token: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<AcceptedInvite, InviteError> {
        let mut tx = begin_with_deadline(&self.pool, self.settings.store_timeout).await?;

        let invite = Invite::find_by_token(token, &mut *tx)
            .await?
            .ok_or(InviteError::NotFound)?;

        if invite.status != InviteStatus::Pending {
            return Err(InviteError::InvalidStatus(invite.status));
        }

        if invite.is_expired(now) {
            Invite::mark_expired(invite.id, &mut *tx).await?;
            tx.commit().await?;
            info!(invite_id = %invite.id, "Invite expired on acceptance attempt");
            return Err(InviteError::Expired);
        }

        if !Invite::claim(invite.id, user_id, now, &mut *tx).await? {
            // Lost a race; report whatever the winner left behind.
            let status = Invite::find_by_id(invite.id, &mut *tx)
                .await?
                .map(|i| i.status)
                .ok_or(InviteError::NotFound)?;
            return Err(InviteError::InvalidStatus(status));
        }

        let (membership, already_member) =
            match Membership::find(invite.room_id, user_id, &mut *tx).await? {
                Some(existing) => (existing, true),
                None => {
                    match Membership::insert_if_absent(invite.room_id, user_id, invite.role, &mut *tx)
                        .await?
                    {
                        Some(inserted) => (inserted, false),
                        None => {
                            let existing = Membership::find(invite.room_id, user_id, &mut *tx)
                                .await?
                                .ok_or(InviteError::StoreUnavailable)?;
                            (existing, true)
                        }
                    }
                }
            };

        tx.commit().await?;

        info!(
            invite_id = %invite.id,
            room_id = %invite.room_id,
            user_id = %user_id,
            role = %membership.role,
            already_member,
            "Invite accepted"
        );
        Ok(AcceptedInvite {
            membership,
            already_member,
        })
    }
}
