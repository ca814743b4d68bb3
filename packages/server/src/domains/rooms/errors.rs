use thiserror::Error;
use tracing::warn;

use super::models::InviteStatus;
use crate::kernel::StoreError;

/// Invite outcomes other than success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("invite not found")]
    NotFound,

    #[error("invite is {0}, not PENDING")]
    InvalidStatus(InviteStatus),

    #[error("invite has expired")]
    Expired,

    #[error("room not found")]
    RoomNotFound,

    #[error("invite store unavailable")]
    StoreUnavailable,
}

impl From<StoreError> for InviteError {
    fn from(e: StoreError) -> Self {
        warn!(error = %e, "Invite store call failed");
        InviteError::StoreUnavailable
    }
}

impl From<sqlx::Error> for InviteError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::from(e).into()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,

    #[error("user is not a member of this room")]
    NotAMember,

    #[error("room store unavailable")]
    StoreUnavailable,
}

impl From<StoreError> for RoomError {
    fn from(e: StoreError) -> Self {
        warn!(error = %e, "Room store call failed");
        RoomError::StoreUnavailable
    }
}
