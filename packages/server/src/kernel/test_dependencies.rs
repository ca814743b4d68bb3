// Test doubles for the infrastructure traits.
//
// InMemoryKeyValueStore stands in for Redis. Its primitives are atomic with
// respect to each other (one mutex around the map), it honours TTLs against
// an injected clock, and it yields before every call so concurrent futures
// actually interleave.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BaseClock, BaseKeyValueStore, BaseSmsService, StoreError};

// =============================================================================
// Mock Clock
// =============================================================================

/// Clock that only moves when told to.
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseClock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// In-memory Key-Value Store
// =============================================================================

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct InMemoryKeyValueStore {
    clock: Arc<dyn BaseClock>,
    entries: Mutex<HashMap<String, Entry>>,
    failures_remaining: Mutex<usize>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryKeyValueStore {
    pub fn new(clock: Arc<dyn BaseClock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
            failures_remaining: Mutex::new(0),
            latency: Mutex::new(None),
        }
    }

    /// Make the next `n` calls fail with `StoreError::Unavailable`.
    pub fn fail_next_calls(&self, n: usize) {
        *self.failures_remaining.lock().unwrap() = n;
    }

    /// Delay every call by `latency` (for deadline tests).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Current value, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        Self::live(&mut entries, key, now).map(|e| e.value.clone())
    }

    /// Remaining TTL of a live key.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        Self::live(&mut entries, key, now)
            .and_then(|e| e.expires_at)
            .and_then(|at| (at - now).to_std().ok())
    }

    /// Drop the TTL of a key, like Redis PERSIST.
    pub fn persist(&self, key: &str) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.expires_at = None;
        }
    }

    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut Entry> {
        let expired = entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn expiry(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::days(365));
        Some(self.clock.now() + ttl)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        tokio::task::yield_now().await;

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut failures = self.failures_remaining.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseKeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.enter().await?;
        Ok(self.raw(key))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.enter().await?;
        let entry = Entry {
            value: value.to_string(),
            expires_at: self.expiry(ttl),
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.enter().await?;
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().unwrap();
        match Self::live(&mut entries, key, now) {
            Some(entry) if entry.value == expected => {
                entry.value = value.to_string();
                entry.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        self.enter().await?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        let matches = Self::live(&mut entries, key, now).is_some_and(|e| e.value == expected);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.enter().await?;
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().unwrap();

        let current = match Self::live(&mut entries, key, now) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|_| StoreError::Unavailable("value is not an integer".to_string()))?,
            None => 0,
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter().await
    }
}

// =============================================================================
// Mock SMS Service
// =============================================================================

/// A message the mock was asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentSms {
    Otp { phone_number: String, code: String },
    Invite { phone_number: String, link: String },
}

#[derive(Default)]
pub struct MockSmsService {
    sent: Mutex<Vec<SentSms>>,
    fail: Mutex<bool>,
}

impl MockSmsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail
    pub fn failing(self) -> Self {
        *self.fail.lock().unwrap() = true;
        self
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }

    /// Last OTP code delivered to `phone_number`
    pub fn last_code_for(&self, phone_number: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|sms| match sms {
                SentSms::Otp {
                    phone_number: to,
                    code,
                } if to == phone_number => Some(code.clone()),
                _ => None,
            })
    }

    fn check(&self) -> Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("mock SMS delivery failure");
        }
        Ok(())
    }
}

#[async_trait]
impl BaseSmsService for MockSmsService {
    async fn send_otp(&self, phone_number: &str, code: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(SentSms::Otp {
            phone_number: phone_number.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_invite(&self, phone_number: &str, invite_link: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push(SentSms::Invite {
            phone_number: phone_number.to_string(),
            link: invite_link.to_string(),
        });
        Ok(())
    }
}
