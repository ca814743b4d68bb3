//! Room endpoints. All require a session.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::RoomId;
use crate::domains::rooms::models::{Room, RoomRole};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::extract::ApiJson;
use crate::server::middleware::AuthUser;

const MAX_ROOM_NAME_LEN: usize = 200;

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    /// Creator's own role; defaults to LANDLORD
    #[serde(default)]
    pub role: Option<RoomRole>,
}

#[derive(Serialize)]
pub struct RoomResponse {
    #[serde(flatten)]
    pub room: Room,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_role: Option<RoomRole>,
}

/// POST /rooms
pub async fn create_room_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() || name.len() > MAX_ROOM_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Room name must be 1-{} characters",
            MAX_ROOM_NAME_LEN
        )));
    }

    let role = body.role.unwrap_or(RoomRole::Landlord);
    let room = state.deps.rooms.create_room(name, user.user_id, role).await?;

    Ok((
        StatusCode::CREATED,
        Json(RoomResponse {
            room,
            my_role: Some(role),
        }),
    ))
}

/// GET /rooms
pub async fn list_rooms_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(state.deps.rooms.list_rooms(user.user_id).await?))
}

/// GET /rooms/:room_id
pub async fn get_room_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.deps.rooms.get_room(room_id).await?;
    let my_role = state
        .deps
        .rooms
        .get_user_role_in_room(user.user_id, room_id)
        .await
        .ok();

    Ok(Json(RoomResponse { room, my_role }))
}
