//! Health check endpoints.
//!
//! `/health` is the liveness probe from `rentcar-web`; `/ready` also pings
//! the database.

use super::state::AppState;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use rentcar_runtime::{HealthCheck, HealthReport};
use rentcar_web::handlers::readiness;

/// Readiness check endpoint.
///
/// Returns 200 OK while the database answers, 503 otherwise.
///
/// ```bash
/// curl http://localhost:5000/ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.database.ping().await {
        Ok(()) => HealthCheck::healthy("database"),
        Err(error) => {
            tracing::warn!(%error, "Database readiness check failed");
            HealthCheck::unhealthy("database", error.to_string())
        },
    };
    readiness(vec![database])
}
