//! Send invite action

use anyhow::Result;
use tracing::{error, info};

use crate::common::{RoomId, UserId};
use crate::domains::rooms::models::{Invite, RoomRole};
use crate::kernel::ServerDeps;

/// Create an invite and text its link to the invitee.
///
/// The invite is committed before delivery. If the SMS fails the invite
/// still exists and can be re-sent or accepted through its link.
pub async fn send_invite(
    room_id: RoomId,
    phone_e164: &str,
    role: RoomRole,
    inviter: UserId,
    deps: &ServerDeps,
) -> Result<Invite> {
    let invite = deps
        .invites
        .create_invite(room_id, phone_e164, role, inviter)
        .await?;

    let link = deps.invites.settings().invite_link(&invite.token);
    deps.sms.send_invite(phone_e164, &link).await.map_err(|e| {
        error!(invite_id = %invite.id, error = %e, "Failed to send invite SMS");
        anyhow::anyhow!("Failed to send invite SMS: {}", e)
    })?;

    info!(invite_id = %invite.id, room_id = %room_id, "Invite sent");
    Ok(invite)
}
