//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use rand::Rng;
use server_core::domains::auth::models::{hash_phone_number, User};
use server_core::domains::rooms::models::{Room, RoomRole};
use server_core::kernel::ServerDeps;

use super::TEST_PHONE_SALT;

/// A phone number no other test uses, in the reserved 555 range.
pub fn unique_phone() -> String {
    format!("+1555{:07}", rand::rng().random_range(0..10_000_000))
}

/// Create a user with a fresh phone number
pub async fn create_test_user(deps: &ServerDeps) -> Result<User> {
    let phone = unique_phone();
    let hash = hash_phone_number(&phone, TEST_PHONE_SALT);
    User::find_or_create(&phone, &hash, &deps.db_pool).await
}

/// Create a room owned by `owner` (who becomes its LANDLORD)
pub async fn create_test_room(deps: &ServerDeps, owner: &User) -> Result<Room> {
    let room = deps
        .rooms
        .create_room("Test Flat", owner.id, RoomRole::Landlord)
        .await?;
    Ok(room)
}
