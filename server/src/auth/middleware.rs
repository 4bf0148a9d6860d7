//! Authentication extractors for Axum handlers.
//!
//! - [`AuthUser`]: a valid, unrevoked access token for an existing account
//! - [`RequireAdmin`]: the same, and the account has the admin role
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn create_driver(
//!     admin: RequireAdmin,
//!     State(state): State<AppState>,
//!     JsonBody(body): JsonBody<DriverRequest>,
//! ) -> WebResult<ApiResponse<Driver>> {
//!     // admin.user is the authenticated administrator
//! }
//! ```

use crate::rental::Actor;
use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use rentcar_auth::{AuthError, Claims};
use rentcar_core::types::{User, UserId};
use rentcar_web::{AppError, BearerToken, CorrelationId};

/// Message returned when a customer calls an admin endpoint.
pub const ADMIN_ONLY: &str = "Unauthorized access, only admin can access this!";

/// Authenticated user.
///
/// Extracts the bearer token, verifies its signature and expiry, checks it
/// was not revoked by logout and loads the account it names.
/// Returns 401 Unauthorized if any step fails.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account, as currently stored
    pub user: User,
    /// Claims of the presented token
    pub claims: Claims,
}

impl AuthUser {
    /// The user's id.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.user.id
    }

    /// Who is acting, for rental commands.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            user_id: self.user.id,
            role: self.user.role,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let Ok(CorrelationId(correlation_id)) = CorrelationId::from_request_parts(parts, state).await;

        let now = state.clock.now();
        let claims = state.tokens.verify(&token, now).map_err(|error| {
            metrics::counter!("http.auth.failures", "reason" => "invalid_token").increment(1);
            tracing::debug!(%correlation_id, %error, "Rejected access token");
            AppError::from(error)
        })?;

        if state.blocklist.is_revoked(claims.jti, now).await {
            metrics::counter!("http.auth.failures", "reason" => "revoked_token").increment(1);
            return Err(AuthError::TokenRevoked.into());
        }

        let user = state
            .users
            .find_by_id(UserId::new(claims.sub))
            .await?
            .ok_or_else(|| {
                tracing::warn!(%correlation_id, user_id = claims.sub, "Token for a deleted account");
                AppError::unauthorized("User not found")
            })?;

        Ok(Self { user, claims })
    }
}

/// Authenticated administrator.
///
/// Returns 403 Forbidden when the account is not an admin. The role is
/// read from the stored account, not the token, so a demotion takes effect
/// immediately.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.role.is_admin() {
            tracing::info!(user_id = %auth.id(), path = %parts.uri.path(), "Admin endpoint refused");
            return Err(AppError::forbidden(ADMIN_ONLY));
        }
        Ok(Self(auth))
    }
}
