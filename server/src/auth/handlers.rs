//! Account endpoints.
//!
//! - `POST /register`: create a customer account
//! - `POST /login`: exchange email and password for an access token
//! - `GET /profile`, `PUT /profile`: read and edit the caller's account
//! - `GET /logout`: revoke the presented token
//! - `GET /users`: every account (admin)

use super::middleware::{AuthUser, RequireAdmin};
use crate::api::PageQuery;
use crate::server::state::AppState;
use axum::extract::State;
use rentcar_auth::{AuthError, PasswordHasher};
use rentcar_core::pagination::NamedPage;
use rentcar_core::types::{NewUser, Role, UserView};
use rentcar_core::validation::Validator;
use rentcar_web::{ApiResponse, AppError, ClientIp, JsonBody, QueryParams, WebResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration payload.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: Option<String>,
    /// Login email
    pub email: Option<String>,
    /// Plain-text password
    pub password: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: Option<String>,
    /// Plain-text password
    pub password: Option<String>,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: &'static str,
    /// Seconds until the token expires
    pub expires_in: i64,
    /// The account
    pub user: UserView,
}

/// Result of logging out.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Account id
    pub id: i64,
    /// Account email
    pub email: String,
}

// ============================================================================
// Validation
// ============================================================================

fn check_profile_fields(v: &mut Validator, body: &RegisterRequest) {
    v.max_len("name", body.name.as_deref(), 100);
    v.max_len("email", body.email.as_deref(), 100);
    v.email("email", body.email.as_deref());
    v.min_len("password", body.password.as_deref(), 8);
    v.max_len("password", body.password.as_deref(), 128);
    v.max_len("address", body.address.as_deref(), 255);
    v.max_len("phone_number", body.phone_number.as_deref(), 50);
}

impl RegisterRequest {
    fn validate(&self) -> WebResult<(String, String, String, String, String)> {
        let mut v = Validator::new();
        let name = v.required("name", self.name.as_deref());
        let email = v.required("email", self.email.as_deref());
        let password = v.secret("password", self.password.as_deref());
        let address = v.required("address", self.address.as_deref());
        let phone = v.required("phone_number", self.phone_number.as_deref());
        check_profile_fields(&mut v, self);

        let (Some(name), Some(email), Some(password), Some(address), Some(phone)) =
            (name, email, password, address, phone)
        else {
            return Err(v.finish().err().unwrap_or_default().into());
        };
        v.finish()?;
        Ok((
            name.to_string(),
            email.to_string(),
            password.to_string(),
            address.to_string(),
            phone.to_string(),
        ))
    }
}

/// Hash off the async executor; PBKDF2 is deliberately slow.
async fn hash_password(hasher: PasswordHasher, password: String) -> WebResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::internal("An internal error occurred").with_source(e))
}

async fn verify_password(hasher: PasswordHasher, password: String, encoded: String) -> WebResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded))
        .await
        .map_err(|e| AppError::internal("An internal error occurred").with_source(e))?
        .map_err(AppError::from)
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a customer account.
///
/// # Errors
///
/// 400 on invalid fields, 409 when the email or phone number is taken.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> WebResult<ApiResponse<UserView>> {
    let (name, email, password, address, phone_number) = body.validate()?;
    let password_hash = hash_password(state.hasher, password).await?;

    let user = state
        .users
        .create(NewUser {
            role: Role::Customer,
            name,
            email,
            password_hash,
            address,
            phone_number,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    Ok(ApiResponse::created(UserView::from(&user)))
}

/// Log in.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
///
/// # Errors
///
/// 400 on missing fields, 403 on bad credentials.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody<LoginRequest>,
) -> WebResult<ApiResponse<LoginResponse>> {
    let mut v = Validator::new();
    let email = v.required("email", body.email.as_deref());
    let password = v.secret("password", body.password.as_deref());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(v.finish().err().unwrap_or_default().into());
    };

    let rejected = || {
        metrics::counter!("http.auth.failures", "reason" => "invalid_credentials").increment(1);
        tracing::info!(%ip, "Login rejected");
        AppError::from(AuthError::InvalidCredentials)
    };

    let Some(user) = state.users.find_by_email(email).await? else {
        return Err(rejected());
    };
    if !verify_password(state.hasher, password.to_string(), user.password_hash.clone()).await? {
        return Err(rejected());
    }

    let issued = state.tokens.issue(user.id.get(), user.role.id(), state.clock.now())?;
    tracing::info!(user_id = %user.id, %ip, "Logged in");

    Ok(ApiResponse::with_message(
        "Login success!",
        LoginResponse {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in: state.tokens.ttl().num_seconds(),
            user: UserView::from(&user),
        },
    ))
}

/// The caller's account.
#[allow(clippy::unused_async)]
pub async fn show_profile(auth: AuthUser) -> WebResult<ApiResponse<UserView>> {
    Ok(ApiResponse::ok(UserView::from(&auth.user)))
}

/// Edit the caller's account. Every field is optional.
///
/// # Errors
///
/// 400 on invalid fields, 409 when the new email or phone number belongs
/// to another account.
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> WebResult<ApiResponse<UserView>> {
    let mut v = Validator::new();
    let name = body.name.as_deref().and_then(|s| v.required("name", Some(s)));
    let email = body.email.as_deref().and_then(|s| v.required("email", Some(s)));
    let password = body.password.as_deref().and_then(|s| v.secret("password", Some(s)));
    let address = body.address.as_deref().and_then(|s| v.required("address", Some(s)));
    let phone = body
        .phone_number
        .as_deref()
        .and_then(|s| v.required("phone_number", Some(s)));
    check_profile_fields(&mut v, &body);
    v.finish()?;

    let mut user = auth.user;
    if let Some(name) = name {
        user.name = name.to_string();
    }
    if let Some(email) = email {
        user.email = email.to_string();
    }
    if let Some(address) = address {
        user.address = address.to_string();
    }
    if let Some(phone) = phone {
        user.phone_number = phone.to_string();
    }
    if let Some(password) = password {
        user.password_hash = hash_password(state.hasher, password.to_string()).await?;
    }

    let user = state.users.update(&user).await?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(ApiResponse::ok(UserView::from(&user)))
}

/// Revoke the presented token until it would have expired.
pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> WebResult<ApiResponse<LogoutResponse>> {
    state
        .blocklist
        .revoke(auth.claims.jti, auth.claims.expires_at())
        .await;

    tracing::info!(user_id = %auth.id(), jti = %auth.claims.jti, "Logged out");
    Ok(ApiResponse::with_message(
        "Logout success!",
        LogoutResponse {
            id: auth.user.id.get(),
            email: auth.user.email,
        },
    ))
}

/// Every account, newest first.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> WebResult<ApiResponse<NamedPage<UserView>>> {
    let page = state.users.list(query.page_request()).await?;
    Ok(ApiResponse::ok(page.map(|u| UserView::from(&u)).named("users")))
}
