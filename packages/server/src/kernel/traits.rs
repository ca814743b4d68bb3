// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The OTP and
// invite engines are domain code written against them.
//
// Naming convention: Base* for trait names (e.g., BaseKeyValueStore, BaseSmsService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::StoreError;

// =============================================================================
// Key-Value Store Trait (Infrastructure - per-key expiry, atomic primitives)
// =============================================================================

/// Shared key-value store with store-native TTL.
///
/// Every read-modify-write goes through one of the atomic primitives below;
/// implementations must not emulate them with a get followed by a set.
#[async_trait]
pub trait BaseKeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Unconditionally write `value`, replacing any existing entry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Write `value` only if the key currently holds exactly `expected`.
    /// Returns false when the entry changed or vanished since it was read.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Delete the key only if it currently holds exactly `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Increment an integer counter and reset its expiry to `ttl`, as one
    /// atomic unit. Returns the new value.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// SMS Trait (Infrastructure - Notifier collaborator)
// =============================================================================

#[async_trait]
pub trait BaseSmsService: Send + Sync {
    /// Deliver a one-time passcode to a normalized phone number
    async fn send_otp(&self, phone_number: &str, code: &str) -> Result<()>;

    /// Deliver a room invite link
    async fn send_invite(&self, phone_number: &str, invite_link: &str) -> Result<()>;
}

// =============================================================================
// Clock Trait
// =============================================================================

/// Source of "now" for expiry decisions. Injected so tests can move time.
pub trait BaseClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
