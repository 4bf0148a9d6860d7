//! Accounts and access control.
//!
//! - [`middleware`]: extractors that authenticate a request
//! - [`handlers`]: register, login, profile, logout and user listing
//! - [`setup`]: start-up admin account

pub mod handlers;
pub mod middleware;
pub mod setup;

pub use middleware::{AuthUser, RequireAdmin, ADMIN_ONLY};
