//! Test harness with testcontainers for integration testing.
//!
//! Uses shared containers across all tests for dramatically improved performance.
//! Containers and migrations are initialized once on first test, then reused.
//! Tests isolate themselves by using fresh phone numbers and rooms.

use anyhow::{Context, Result};
use server_core::domains::auth::{JwtService, OtpSettings};
use server_core::domains::rooms::InviteSettings;
use server_core::kernel::{MockClock, MockSmsService, RedisStore, ServerDeps};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

pub const TEST_PHONE_SALT: &str = "test-phone-salt";

/// Shared test infrastructure that persists across all tests.
/// Containers are started once and reused, migrations run once.
struct SharedTestInfra {
    db_url: String,
    redis_url: String,
    // Keep containers alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
    _redis: ContainerAsync<Redis>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let redis = Redis::default()
            .start()
            .await
            .context("Failed to start Redis container")?;

        let redis_host = redis.get_host().await?;
        let redis_port = redis.get_host_port_ipv4(6379).await?;
        let redis_url = format!("redis://{}:{}", redis_host, redis_port);

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            redis_url,
            _postgres: postgres,
            _redis: redis,
        })
    }

    pub(super) async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness wiring the real stores to mock SMS and a controllable clock.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let room = ctx.deps.rooms.create_room(...).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    /// Database pool - use this for test fixtures.
    pub db_pool: PgPool,
    pub redis_store: Arc<RedisStore>,
    pub clock: Arc<MockClock>,
    pub sms: Arc<MockSmsService>,
    pub deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // Pool and Redis connection are dropped with the harness
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_settings(OtpSettings::default(), InviteSettings::default()).await
    }

    /// Harness with custom engine settings, e.g. a tiny rate threshold.
    pub async fn with_settings(
        otp_settings: OtpSettings,
        invite_settings: InviteSettings,
    ) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let redis_store = Arc::new(
            RedisStore::connect(&infra.redis_url, Duration::from_secs(5))
                .await
                .context("Failed to connect to test Redis")?,
        );

        let clock = Arc::new(MockClock::new());
        let sms = Arc::new(MockSmsService::new());
        let jwt_service = Arc::new(JwtService::new("test_secret_key", "test_issuer".to_string()));

        let deps = ServerDeps::new(
            db_pool.clone(),
            redis_store.clone(),
            sms.clone(),
            clock.clone(),
            jwt_service,
            otp_settings,
            invite_settings,
            TEST_PHONE_SALT.to_string(),
        );

        Ok(Self {
            db_pool,
            redis_store,
            clock,
            sms,
            deps,
        })
    }
}
