//! Authentication configuration.
//!
//! Values come from the application's configuration; nothing here reads the
//! environment.

use std::time::Duration;

/// Default access token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default PBKDF2 iteration count.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Token signing and password hashing settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for signing access tokens.
    pub token_secret: Vec<u8>,

    /// How long an access token stays valid.
    ///
    /// Default: 15 minutes
    pub token_ttl: Duration,

    /// PBKDF2-HMAC-SHA256 iterations for new password hashes.
    ///
    /// Default: 100 000
    pub hash_iterations: u32,
}

impl AuthConfig {
    /// Create a configuration with the given signing secret.
    #[must_use]
    pub const fn new(token_secret: Vec<u8>) -> Self {
        Self {
            token_secret,
            token_ttl: DEFAULT_TOKEN_TTL,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
        }
    }

    /// Set token time-to-live.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the PBKDF2 iteration count.
    #[must_use]
    pub const fn with_hash_iterations(mut self, iterations: u32) -> Self {
        self.hash_iterations = iterations;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("hash_iterations", &self.hash_iterations)
            .finish()
    }
}
