//! OTP engine: issue and verify single-use passcodes against the shared
//! key-value store.
//!
//! State machine per subject:
//!
//! ```text
//! absent --issue--> issued --verify ok--------> absent (consumed)
//!                     |  \--verify wrong------> issued (attempts + 1)
//!                     |--past expires_at------> absent (Expired)
//!                     \--attempts exhausted---> absent (AttemptsExceeded)
//! ```
//!
//! No tombstones are kept; issuing again always starts a fresh cycle.
//! There is no in-process locking. Every update is a compare-and-swap
//! against the value that was read, so concurrent verifications of one
//! subject cannot lose an attempt increment or consume a code twice.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use super::errors::OtpError;
use super::models::{generate_code, mask_phone, OtpRecord};
use super::rate_limit::RateLimiter;
use crate::kernel::{with_deadline, BaseClock, BaseKeyValueStore, StoreError};

/// Re-read rounds before a contended verification gives up.
const MAX_SWAP_ROUNDS: usize = 8;

/// Engine options, injected at construction.
#[derive(Clone, Debug, TypedBuilder)]
pub struct OtpSettings {
    /// Failed verifications allowed before the record is destroyed
    #[builder(default = 5)]
    pub max_attempts: u32,
    /// Lifetime of an issued code
    #[builder(default = chrono::Duration::minutes(5))]
    pub otp_window: chrono::Duration,
    /// Rate-limit window, restarted on every counted issuance
    #[builder(default = Duration::from_secs(60))]
    pub rate_window: Duration,
    /// Issuances per window before `is_rate_limited` reports true
    #[builder(default = 10)]
    pub rate_threshold: i64,
    /// Deadline for each individual store call
    #[builder(default = Duration::from_secs(2))]
    pub store_timeout: Duration,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

pub struct OtpService {
    store: Arc<dyn BaseKeyValueStore>,
    clock: Arc<dyn BaseClock>,
    rate_limiter: RateLimiter,
    settings: OtpSettings,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn BaseKeyValueStore>,
        clock: Arc<dyn BaseClock>,
        settings: OtpSettings,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            store.clone(),
            settings.rate_window,
            settings.rate_threshold,
            settings.store_timeout,
        );

        Self {
            store,
            clock,
            rate_limiter,
            settings,
        }
    }

    pub fn settings(&self) -> &OtpSettings {
        &self.settings
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, OtpError> {
        Ok(with_deadline(self.settings.store_timeout, fut).await?)
    }

    /// Issue a fresh code for `subject`, replacing any live one.
    ///
    /// The code is returned for out-of-band delivery only.
    pub async fn issue(&self, subject: &str) -> Result<String, OtpError> {
        let now = self.clock.now();
        let record = OtpRecord::new(generate_code(), now, self.settings.otp_window);
        let raw = record
            .encode()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        self.call(self.store.set_with_ttl(
            &OtpRecord::key(subject),
            &raw,
            record.remaining(now),
        ))
        .await?;

        debug!(subject = %mask_phone(subject), expires_at = %record.expires_at, "OTP issued");
        Ok(record.code)
    }

    pub async fn is_rate_limited(&self, subject: &str) -> Result<bool, OtpError> {
        Ok(self.rate_limiter.is_limited(subject).await?)
    }

    pub async fn increment_rate_limit(&self, subject: &str) -> Result<(), OtpError> {
        let count = self.rate_limiter.increment(subject).await?;
        debug!(subject = %mask_phone(subject), count, "rate-limit counter incremented");
        Ok(())
    }

    /// Check a submitted code.
    ///
    /// Success consumes the record. A wrong code bumps `attempts` and keeps
    /// the original expiry. Expired and exhausted records are deleted.
    pub async fn verify(&self, subject: &str, submitted: &str) -> Result<(), OtpError> {
        let key = OtpRecord::key(subject);

        for _ in 0..MAX_SWAP_ROUNDS {
            let Some(raw) = self.call(self.store.get(&key)).await? else {
                return Err(OtpError::NotFound);
            };

            let mut record = match OtpRecord::decode(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(subject = %mask_phone(subject), error = %e, "discarding unreadable OTP record");
                    self.call(self.store.compare_and_delete(&key, &raw)).await?;
                    return Err(OtpError::NotFound);
                }
            };

            let now = self.clock.now();

            if record.is_expired(now) {
                if self.call(self.store.compare_and_delete(&key, &raw)).await? {
                    info!(subject = %mask_phone(subject), "OTP expired");
                    return Err(OtpError::Expired);
                }
                continue;
            }

            if record.attempts >= self.settings.max_attempts {
                if self.call(self.store.compare_and_delete(&key, &raw)).await? {
                    info!(subject = %mask_phone(subject), attempts = record.attempts, "OTP attempts exhausted");
                    return Err(OtpError::AttemptsExceeded);
                }
                continue;
            }

            if record.matches(submitted) {
                if self.call(self.store.compare_and_delete(&key, &raw)).await? {
                    info!(subject = %mask_phone(subject), "OTP verified");
                    return Ok(());
                }
                // Someone else consumed or changed it first; re-read.
                continue;
            }

            record.attempts += 1;
            let updated = record
                .encode()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            if self
                .call(self.store.compare_and_set(&key, &raw, &updated, record.remaining(now)))
                .await?
            {
                debug!(subject = %mask_phone(subject), attempts = record.attempts, "OTP mismatch");
                return Err(OtpError::Mismatch {
                    attempts: record.attempts,
                });
            }
        }

        warn!(subject = %mask_phone(subject), "OTP verification lost every swap round");
        Err(StoreError::Contended(key).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{InMemoryKeyValueStore, MockClock};

    const SUBJECT: &str = "+15551234567";

    struct Fixture {
        clock: Arc<MockClock>,
        store: Arc<InMemoryKeyValueStore>,
        otp: OtpService,
    }

    fn fixture(settings: OtpSettings) -> Fixture {
        let clock = Arc::new(MockClock::new());
        let store = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
        let otp = OtpService::new(store.clone(), clock.clone(), settings);
        Fixture { clock, store, otp }
    }

    fn wrong_code(code: &str) -> String {
        let wrong = if code == "000000" { "111111" } else { "000000" };
        wrong.to_string()
    }

    fn stored(store: &InMemoryKeyValueStore) -> Option<OtpRecord> {
        store
            .raw(&OtpRecord::key(SUBJECT))
            .map(|raw| OtpRecord::decode(&raw).unwrap())
    }

    #[tokio::test]
    async fn test_issue_stores_fresh_record() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();

        let record = stored(&f.store).unwrap();
        assert_eq!(record.code, code);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.expires_at, f.clock.now() + chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_correct_code_verifies_exactly_once() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();

        assert_eq!(f.otp.verify(SUBJECT, &code).await, Ok(()));
        assert_eq!(f.otp.verify(SUBJECT, &code).await, Err(OtpError::NotFound));
        assert!(stored(&f.store).is_none());
    }

    #[tokio::test]
    async fn test_never_issued_is_not_found() {
        let f = fixture(OtpSettings::default());
        assert_eq!(f.otp.verify(SUBJECT, "123456").await, Err(OtpError::NotFound));
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let f = fixture(OtpSettings::default());
        let first = f.otp.issue(SUBJECT).await.unwrap();
        let mut second = f.otp.issue(SUBJECT).await.unwrap();
        while second == first {
            second = f.otp.issue(SUBJECT).await.unwrap();
        }

        assert_eq!(
            f.otp.verify(SUBJECT, &first).await,
            Err(OtpError::Mismatch { attempts: 1 })
        );
        assert_eq!(f.otp.verify(SUBJECT, &second).await, Ok(()));
    }

    #[tokio::test]
    async fn test_mismatch_keeps_original_expiry() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();
        let issued = stored(&f.store).unwrap();

        f.clock.advance(chrono::Duration::minutes(2));
        assert_eq!(
            f.otp.verify(SUBJECT, &wrong_code(&code)).await,
            Err(OtpError::Mismatch { attempts: 1 })
        );

        let after = stored(&f.store).unwrap();
        assert_eq!(after.expires_at, issued.expires_at);
        assert_eq!(after.attempts, 1);
        assert_eq!(
            f.store.ttl(&OtpRecord::key(SUBJECT)),
            Some(std::time::Duration::from_secs(180))
        );
    }

    #[tokio::test]
    async fn test_attempts_exhausted_rejects_correct_code() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();
        let wrong = wrong_code(&code);

        for attempt in 1..=3 {
            assert_eq!(
                f.otp.verify(SUBJECT, &wrong).await,
                Err(OtpError::Mismatch { attempts: attempt })
            );
        }
        assert_eq!(stored(&f.store).unwrap().attempts, 3);

        for attempt in 4..=5 {
            assert_eq!(
                f.otp.verify(SUBJECT, &wrong).await,
                Err(OtpError::Mismatch { attempts: attempt })
            );
        }

        assert_eq!(
            f.otp.verify(SUBJECT, &code).await,
            Err(OtpError::AttemptsExceeded)
        );
        assert!(stored(&f.store).is_none());
        assert_eq!(f.otp.verify(SUBJECT, &code).await, Err(OtpError::NotFound));
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted() {
        // Keep the store TTL from removing the key first so the engine's own
        // expiry check is what fires.
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();
        f.store.persist(&OtpRecord::key(SUBJECT));

        f.clock.advance(chrono::Duration::minutes(5) + chrono::Duration::seconds(1));
        assert_eq!(f.otp.verify(SUBJECT, &code).await, Err(OtpError::Expired));
        assert!(stored(&f.store).is_none());
    }

    #[tokio::test]
    async fn test_store_ttl_expiry_reads_as_not_found() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();

        f.clock.advance(chrono::Duration::minutes(6));
        assert_eq!(f.otp.verify(SUBJECT, &code).await, Err(OtpError::NotFound));
    }

    #[tokio::test]
    async fn test_reissue_after_exhaustion_starts_fresh_cycle() {
        let settings = OtpSettings::builder().max_attempts(1).build();
        let f = fixture(settings);
        let code = f.otp.issue(SUBJECT).await.unwrap();
        f.otp.verify(SUBJECT, &wrong_code(&code)).await.unwrap_err();
        assert_eq!(
            f.otp.verify(SUBJECT, &code).await,
            Err(OtpError::AttemptsExceeded)
        );

        let fresh = f.otp.issue(SUBJECT).await.unwrap();
        assert_eq!(stored(&f.store).unwrap().attempts, 0);
        assert_eq!(f.otp.verify(SUBJECT, &fresh).await, Ok(()));
    }

    #[tokio::test]
    async fn test_concurrent_correct_submissions_succeed_once() {
        let f = fixture(OtpSettings::default());
        let code = f.otp.issue(SUBJECT).await.unwrap();

        let results = futures::future::join_all(
            (0..8).map(|_| f.otp.verify(SUBJECT, &code)),
        )
        .await;

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| *r == Err(OtpError::NotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_mismatches_all_counted() {
        let f = fixture(OtpSettings::builder().max_attempts(10).build());
        let code = f.otp.issue(SUBJECT).await.unwrap();
        let wrong = wrong_code(&code);

        let results =
            futures::future::join_all((0..4).map(|_| f.otp.verify(SUBJECT, &wrong))).await;

        let mut attempts: Vec<u32> = results
            .into_iter()
            .map(|r| match r {
                Err(OtpError::Mismatch { attempts }) => attempts,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        attempts.sort();
        assert_eq!(attempts, vec![1, 2, 3, 4]);
        assert_eq!(stored(&f.store).unwrap().attempts, 4);
    }

    #[tokio::test]
    async fn test_unreadable_record_is_discarded() {
        let f = fixture(OtpSettings::default());
        f.store
            .set_with_ttl(&OtpRecord::key(SUBJECT), "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(f.otp.verify(SUBJECT, "123456").await, Err(OtpError::NotFound));
        assert!(f.store.raw(&OtpRecord::key(SUBJECT)).is_none());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_unavailable() {
        let f = fixture(OtpSettings::default());
        f.store.fail_next_calls(1);
        assert_eq!(f.otp.issue(SUBJECT).await, Err(OtpError::StoreUnavailable));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let settings = OtpSettings::builder()
            .store_timeout(Duration::from_millis(20))
            .build();
        let f = fixture(settings);
        f.store.set_latency(Duration::from_millis(200));

        assert_eq!(
            f.otp.verify(SUBJECT, "123456").await,
            Err(OtpError::StoreUnavailable)
        );
    }

    #[tokio::test]
    async fn test_rate_limit_threshold_and_window() {
        let settings = OtpSettings::builder().rate_threshold(10).build();
        let f = fixture(settings);

        for _ in 0..10 {
            assert!(!f.otp.is_rate_limited(SUBJECT).await.unwrap());
            f.otp.issue(SUBJECT).await.unwrap();
            f.otp.increment_rate_limit(SUBJECT).await.unwrap();
        }
        assert!(f.otp.is_rate_limited(SUBJECT).await.unwrap());

        f.clock.advance(chrono::Duration::seconds(61));
        assert!(!f.otp.is_rate_limited(SUBJECT).await.unwrap());
    }
}
