//! # RentCar Auth
//!
//! Credential handling for the RentCar back-end:
//!
//! - [`PasswordHasher`]: salted PBKDF2-HMAC-SHA256 password hashes
//! - [`TokenService`]: HS256 signed access tokens with a short TTL
//! - [`TokenBlocklist`]: revocation of tokens on logout
//!
//! Nothing here knows about HTTP or the database; the server crate wires
//! these into extractors and handlers.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use rentcar_auth::{AuthConfig, PasswordHasher, TokenService};
//!
//! # fn main() -> rentcar_auth::Result<()> {
//! let config = AuthConfig::new(b"change-me".to_vec()).with_hash_iterations(1_000);
//!
//! let hasher = PasswordHasher::new(config.hash_iterations);
//! let stored = hasher.hash("s3cret!!");
//! assert!(hasher.verify("s3cret!!", &stored)?);
//!
//! let tokens = TokenService::new(&config);
//! let issued = tokens.issue(1, 2, Utc::now())?;
//! assert_eq!(tokens.verify(&issued.token, Utc::now())?.sub, 1);
//! # Ok(())
//! # }
//! ```

pub mod blocklist;
pub mod config;
pub mod error;
pub mod password;
pub mod token;

pub use blocklist::{InMemoryBlocklist, TokenBlocklist};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use password::PasswordHasher;
pub use token::{Claims, IssuedToken, TokenService};
