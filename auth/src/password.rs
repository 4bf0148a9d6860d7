//! Password hashing.
//!
//! Hashes are PBKDF2-HMAC-SHA256 with a random 16-byte salt, encoded as
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` (base64, no padding). The
//! iteration count travels with the hash so it can be raised without
//! invalidating existing accounts.

use crate::error::{AuthError, Result};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hashes and verifies passwords.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    /// Hasher producing hashes with `iterations` rounds.
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hash a password with a fresh salt.
    #[must_use]
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let digest = derive(password, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        )
    }

    /// Check a password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedHash`] if the stored value is not a
    /// hash this module produced. A wrong password is `Ok(false)`.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool> {
        let malformed = || AuthError::MalformedHash(SCHEME.to_string());

        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if scheme != SCHEME {
            return Err(malformed());
        }

        let iterations: u32 = iterations.parse().map_err(|_| malformed())?;
        if iterations == 0 {
            return Err(malformed());
        }
        let salt = STANDARD_NO_PAD.decode(salt).map_err(|_| malformed())?;
        let expected = STANDARD_NO_PAD.decode(expected).map_err(|_| malformed())?;

        let actual = derive(password, &salt, iterations);
        Ok(constant_time_eq::constant_time_eq(&actual, &expected))
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FAST: PasswordHasher = PasswordHasher::new(1_000);

    #[test]
    fn verifies_correct_password() {
        let hash = FAST.hash("correct horse");
        assert!(hash.starts_with("pbkdf2-sha256$1000$"));
        assert!(FAST.verify("correct horse", &hash).unwrap());
        assert!(!FAST.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(FAST.hash("same"), FAST.hash("same"));
    }

    #[test]
    fn honours_stored_iteration_count() {
        let old = PasswordHasher::new(500).hash("s3cret!!");
        assert!(FAST.verify("s3cret!!", &old).unwrap());
    }

    #[test]
    fn rejects_foreign_formats() {
        for bad in ["", "plain", "bcrypt$10$x$y", "pbkdf2-sha256$x$AA$AA", "pbkdf2-sha256$0$AA$AA"] {
            assert!(matches!(FAST.verify("pw", bad), Err(AuthError::MalformedHash(_))), "{bad}");
        }
    }
}
