//! Health check endpoints.
//!
//! Used by load balancers and monitoring systems.

use axum::{http::StatusCode, Json};
use rentcar_runtime::{HealthCheck, HealthReport, HealthStatus};

/// Liveness: the process is up. Checks no dependencies.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthCheck>) {
    (StatusCode::OK, Json(HealthCheck::healthy("service")))
}

/// Turn readiness checks into a response.
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
#[must_use]
pub fn readiness(checks: Vec<HealthCheck>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::new(checks);
    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let (status, Json(check)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check.status, HealthStatus::Healthy);
    }

    #[test]
    fn degraded_is_still_ready() {
        let (status, Json(report)) = readiness(vec![
            HealthCheck::healthy("database"),
            HealthCheck::degraded("store", "busy"),
        ]);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn unhealthy_is_unavailable() {
        let (status, _) = readiness(vec![HealthCheck::unhealthy("database", "connection refused")]);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
