//! Success envelope.
//!
//! Every successful response has the shape
//! `{"message": "Success", "data": <payload>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Default success message.
pub const SUCCESS: &str = "Success";

/// JSON success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    /// Human-readable outcome
    pub message: String,
    /// Payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// 200 with the default message.
    pub fn ok(data: T) -> Self {
        Self::with_message(SUCCESS, data)
    }

    /// 201 with the default message.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    /// 201 with a custom message.
    pub fn created_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::with_message(message, data)
        }
    }

    /// 200 with a custom message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
