// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::domains::auth::JwtService;
use server_core::kernel::{
    BaseKeyValueStore, BaseSmsService, LoggingSmsService, RedisStore, ServerDeps, SystemClock,
    TwilioAdapter,
};
use server_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::{TwilioOptions, TwilioService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Roomkey API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Connect to Redis
    let kv_store: Arc<dyn BaseKeyValueStore> = Arc::new(
        RedisStore::connect(&config.redis_url, config.store_timeout())
            .await
            .context("Failed to connect to Redis")?,
    );
    tracing::info!("Redis connected");

    // SMS: Twilio when fully configured, otherwise log messages
    let sms: Arc<dyn BaseSmsService> = match &config.twilio {
        Some(twilio) => {
            let service = Arc::new(TwilioService::new(TwilioOptions {
                account_sid: twilio.account_sid.clone(),
                auth_token: twilio.auth_token.clone(),
                from_number: twilio.from_number.clone(),
                api_base: None,
            }));
            Arc::new(TwilioAdapter::new(service, config.otp_expiry_minutes))
        }
        None => {
            tracing::warn!("Twilio not configured, SMS will be logged instead of sent");
            Arc::new(LoggingSmsService)
        }
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let deps = ServerDeps::new(
        pool,
        kv_store,
        sms,
        Arc::new(SystemClock),
        jwt_service,
        config.otp_settings(),
        config.invite_settings(),
        config.phone_hash_salt.clone(),
    );

    // Build application
    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
