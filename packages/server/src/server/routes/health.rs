use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::time::Duration;

use crate::server::app::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: ComponentHealth,
    key_value_store: ComponentHealth,
    connection_pool: ConnectionPoolHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

/// Health check endpoint
///
/// Checks Postgres and the key-value store. Returns 200 OK if both answer,
/// 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let deps = &state.deps;

    let database = match tokio::time::timeout(
        CHECK_TIMEOUT,
        sqlx::query("SELECT 1").execute(&deps.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => ComponentHealth::ok(),
        Ok(Err(e)) => ComponentHealth::failed(format!("Query failed: {}", e)),
        Err(_) => ComponentHealth::failed("Query timeout (>5s)".to_string()),
    };

    let key_value_store = match tokio::time::timeout(CHECK_TIMEOUT, deps.kv_store.ping()).await {
        Ok(Ok(())) => ComponentHealth::ok(),
        Ok(Err(e)) => ComponentHealth::failed(e.to_string()),
        Err(_) => ComponentHealth::failed("Ping timeout (>5s)".to_string()),
    };

    let connection_pool = ConnectionPoolHealth {
        size: deps.db_pool.size(),
        idle_connections: deps.db_pool.num_idle(),
        max_connections: deps.db_pool.options().get_max_connections(),
    };

    let is_healthy = database.status == "ok" && key_value_store.status == "ok";
    let (status_code, status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            key_value_store,
            connection_pool,
        }),
    )
}
