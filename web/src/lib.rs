//! Axum integration for the RentCar back-end.
//!
//! This crate is the reusable part of the imperative shell: everything a
//! handler needs that is not specific to one resource.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, multipart
//! │  - Request parsing and validation       │  ← Bearer tokens
//! │  - Response envelopes and errors        │  ← Correlation ids, logging
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Pricing, validation, slugs           │  ← Testable at memory speed
//! │  - Rental lifecycle reducer             │  ← No I/O, no side effects
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rentcar_web::{ApiResponse, JsonBody, WebResult};
//!
//! async fn create_category(
//!     State(state): State<AppState>,
//!     JsonBody(body): JsonBody<CategoryBody>,
//! ) -> WebResult<ApiResponse<CarCategory>> {
//!     let category = state.categories.create(body.validate()?).await?;
//!     Ok(ApiResponse::created(category))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;

// Re-export key types for convenience
pub use error::{AppError, WebResult};
pub use extractors::{BearerToken, ClientIp, CorrelationId, JsonBody, PathParam, QueryParams};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use response::ApiResponse;
