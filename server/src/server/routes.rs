//! Router configuration for the RentCar back-end.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{cars, categories, drivers, maintenances, transactions};
use crate::auth::handlers as auth;
use crate::config::{ServerConfig, StorageConfig};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{
    routing::{get, post, put},
    Router,
};
use rentcar_web::handlers::health_check;
use rentcar_web::middleware::correlation_id_layer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Static path segments (`/transactions/customer`, `/cars/upload-image/:id`,
/// ...) are matched before the `:id` routes that share their prefix.
///
/// Layers, outermost first: correlation id, tracing, CORS, body limits.
pub fn build_router(state: AppState, server: &ServerConfig, storage: &StorageConfig) -> Router {
    let account_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/profile", get(auth::show_profile).put(auth::update_profile))
        .route("/logout", get(auth::logout))
        .route("/users", get(auth::list_users));

    let catalogue_routes = Router::new()
        .route("/car-categories", post(categories::create).get(categories::list))
        .route(
            "/car-categories/:id",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/car-brands", get(categories::brands))
        .route("/cars", post(cars::create).get(cars::list))
        .route("/cars/upload-image/:id", put(cars::upload_image))
        .route("/cars/:id", get(cars::show).put(cars::update).delete(cars::delete));

    let fleet_routes = Router::new()
        .route("/drivers", post(drivers::create).get(drivers::list))
        .route("/drivers-available", get(drivers::available))
        .route(
            "/drivers/:id",
            get(drivers::show).put(drivers::update).delete(drivers::delete),
        )
        .route(
            "/car-maintenances",
            post(maintenances::create).get(maintenances::list),
        )
        .route(
            "/car-maintenances/:id",
            get(maintenances::show)
                .put(maintenances::update)
                .delete(maintenances::delete),
        );

    let rental_routes = Router::new()
        .route("/transactions", post(transactions::book))
        .route("/transactions/customer", get(transactions::customer_list))
        .route("/transactions/admin", get(transactions::admin_list))
        .route("/transactions/generate_report", post(transactions::generate_report))
        .route(
            "/transactions/upload-payment-proof/:id",
            put(transactions::upload_payment_proof),
        )
        .route("/transactions/verify-payment/:id", put(transactions::verify_payment))
        .route("/transactions/cancel/:id", put(transactions::cancel))
        .route("/transactions/return-car/:id", put(transactions::return_car))
        .route("/transactions/:id", get(transactions::show));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .merge(account_routes)
        .merge(catalogue_routes)
        .merge(fleet_routes)
        .merge(rental_routes)
        .nest_service(&public_mount(&storage.public_path), ServeDir::new(&storage.upload_dir))
        .layer(DefaultBodyLimit::max(server.body_limit))
        .layer(RequestBodyLimitLayer::new(server.body_limit))
        .layer(cors(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-correlation-id"),
        ])
}

/// `/uploads`-style mount point for stored images.
fn public_mount(public_path: &str) -> String {
    let trimmed = public_path.trim_matches('/');
    if trimmed.is_empty() {
        "/uploads".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_mount_is_normalised() {
        assert_eq!(public_mount("/uploads/"), "/uploads");
        assert_eq!(public_mount("media"), "/media");
        assert_eq!(public_mount("/"), "/uploads");
    }
}
