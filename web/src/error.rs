//! Error types for web handlers.
//!
//! [`AppError`] is the single error type handlers return. Library errors
//! convert into it with `?`, choosing the status code the API documents for
//! them; anything unexpected becomes a logged 500 with a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rentcar_auth::AuthError;
use rentcar_core::pricing::PricingError;
use rentcar_core::repository::RepositoryError;
use rentcar_core::validation::ValidationErrors;
use rentcar_runtime::StoreError;
use serde::Serialize;
use std::fmt;

/// Message sent with every validation failure.
pub const INVALID_DATA: &str = "Invalid data!";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>, Path(id): Path<i64>) -> WebResult<ApiResponse<Car>> {
///     let car = state.cars.find(CarId::new(id)).await?
///         .ok_or_else(|| AppError::not_found("Car not found"))?;
///     Ok(ApiResponse::ok(car))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Structured details, e.g. per-field validation messages
    data: Option<serde_json::Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            data: None,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach structured details to the response body.
    #[must_use]
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// HTTP status this error responds with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// 400 with per-field messages.
    #[must_use]
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_DATA, "VALIDATION_ERROR").with_data(errors)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// 408 Request Timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, message, "TIMEOUT")
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            message: self.message,
            code: self.code,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(&errors)
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found("Resource not found"),
            RepositoryError::Conflict(message) => Self::conflict(message),
            RepositoryError::Database(_) => {
                Self::internal("An internal error occurred").with_source(err)
            },
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::forbidden("Invalid email or password"),
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::TokenRevoked => {
                Self::unauthorized(err.to_string())
            },
            AuthError::MalformedHash(_) | AuthError::Internal(_) => {
                Self::internal("An internal error occurred").with_source(err)
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => Self::timeout("Request timed out"),
            StoreError::ShutdownInProgress => Self::unavailable("Server is shutting down"),
            other => Self::internal("An internal error occurred").with_source(other),
        }
    }
}

macro_rules! rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    Self::new(rejection.status(), rejection.body_text(), "INVALID_REQUEST")
                }
            }
        )+
    };
}

rejection!(JsonRejection, QueryRejection, PathRejection, MultipartRejection, MultipartError);

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rentcar_core::repository::conflicts;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn display_includes_code() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[tokio::test]
    async fn validation_errors_carry_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "required field");

        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["message"], INVALID_DATA);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["data"]["email"][0], "required field");
    }

    #[tokio::test]
    async fn data_is_omitted_when_absent() {
        let body = body_json(AppError::not_found("Car not found").into_response()).await;
        assert!(body.get("data").is_none());
    }

    #[test]
    fn repository_errors_map_to_statuses() {
        assert_eq!(AppError::from(RepositoryError::NotFound).status(), StatusCode::NOT_FOUND);

        let conflict = AppError::from(RepositoryError::Conflict(conflicts::EMAIL_TAKEN.to_string()));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.message(), conflicts::EMAIL_TAKEN);

        let db = AppError::from(RepositoryError::Database("connection reset".to_string()));
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.message(), "An internal error occurred");
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(AppError::from(AuthError::InvalidCredentials).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(AuthError::TokenRevoked).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::from(AuthError::Internal("hmac".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_timeout_is_a_timeout() {
        let err = AppError::from(StoreError::Timeout);
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code(), "TIMEOUT");
    }
}
