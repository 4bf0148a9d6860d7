//! Start-up admin account.

use crate::config::BootstrapAdmin;
use anyhow::Context;
use rentcar_auth::PasswordHasher;
use rentcar_core::repository::UserRepository;
use rentcar_core::types::{NewUser, Role};

/// Create the configured admin account unless its email is already taken.
///
/// Returns `true` when an account was created.
///
/// # Errors
///
/// Returns an error if the repository fails or the hashing task panics.
pub async fn ensure_admin(
    users: &dyn UserRepository,
    hasher: PasswordHasher,
    admin: &BootstrapAdmin,
) -> anyhow::Result<bool> {
    if let Some(existing) = users
        .find_by_email(&admin.email)
        .await
        .context("Failed to look up admin account")?
    {
        if !existing.role.is_admin() {
            tracing::warn!(email = %admin.email, "Bootstrap admin email belongs to a customer account");
        }
        return Ok(false);
    }

    let password = admin.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("Password hashing task failed")?;

    let user = users
        .create(NewUser {
            role: Role::Admin,
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash,
            address: "-".to_string(),
            phone_number: format!("admin-{}", admin.email),
        })
        .await
        .context("Failed to create admin account")?;

    tracing::info!(user_id = %user.id, email = %user.email, "Created admin account");
    Ok(true)
}
