//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint (checks database and Redis connectivity)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "A backing service is unreachable", body = HealthResponse)
    )
)]
pub async fn readiness_check(State(state): State<crate::AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = sqlx::query("SELECT 1").execute(&state.pool).await;
    let redis = state.services.redis.ping().await;

    let (code, status) = match (database, redis) {
        (Ok(_), Ok(())) => (StatusCode::OK, "ready"),
        (Err(e), _) => {
            tracing::warn!(error = %e, "Readiness check: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Readiness check: redis unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "redis unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
