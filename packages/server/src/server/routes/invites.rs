//! Invite endpoints.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{InviteId, MembershipId, RoomId};
use crate::domains::auth::models::normalize_phone;
use crate::domains::rooms::actions::send_invite;
use crate::domains::rooms::models::{Invite, InviteStatus, RoomRole};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::extract::ApiJson;
use crate::server::middleware::AuthUser;

#[derive(Deserialize)]
pub struct CreateInviteRequest {
    pub phone_number: String,
    pub role: RoomRole,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub id: InviteId,
    pub room_id: RoomId,
    pub role: RoomRole,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            id: invite.id,
            room_id: invite.room_id,
            role: invite.role,
            status: invite.status,
            expires_at: invite.expires_at,
        }
    }
}

#[derive(Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct AcceptInviteResponse {
    pub membership_id: MembershipId,
    pub room_id: RoomId,
    pub role: RoomRole,
    pub already_member: bool,
}

/// POST /rooms/:room_id/invites
pub async fn create_invite_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
    ApiJson(body): ApiJson<CreateInviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    let phone = normalize_phone(&body.phone_number)
        .ok_or_else(|| ApiError::bad_request("Invalid phone number"))?;

    let invite = send_invite(room_id, &phone, body.role, user.user_id, &state.deps).await?;

    Ok((StatusCode::CREATED, Json(invite.into())))
}

/// GET /invites/:token
///
/// Public so an invitee can preview before signing in.
pub async fn get_invite_handler(
    Extension(state): Extension<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InviteResponse>, ApiError> {
    let invite = state.deps.invites.get_invite_by_token(&token).await?;
    Ok(Json(invite.into()))
}

/// POST /invites/accept
pub async fn accept_invite_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<AcceptInviteRequest>,
) -> Result<Json<AcceptInviteResponse>, ApiError> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Invite token is required"));
    }

    let accepted = state.deps.invites.accept_invite(token, user.user_id).await?;

    Ok(Json(AcceptInviteResponse {
        membership_id: accepted.membership.id,
        room_id: accepted.membership.room_id,
        role: accepted.membership.role,
        already_member: accepted.already_member,
    }))
}
