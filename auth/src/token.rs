//! Signed access tokens.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256:
//! `base64url(header).base64url(claims).base64url(signature)`. Only the
//! `HS256` algorithm is accepted; anything else is rejected before the
//! signature is even computed.

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Role id at issue time.
    pub role: i64,
    /// Unique token id, used for revocation.
    pub jti: Uuid,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly issued token together with its claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded bearer token.
    pub token: String,
    /// What the token asserts.
    pub claims: Claims,
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: chrono::Duration,
}

impl TokenService {
    /// Build from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.token_secret.clone(),
            ttl: chrono::Duration::from_std(config.token_ttl)
                .unwrap_or_else(|_| chrono::Duration::minutes(15)),
        }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Issue a token for `user_id` valid from `now` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the claims cannot be serialized
    /// or the key is rejected by HMAC.
    pub fn issue(&self, user_id: i64, role_id: i64, now: DateTime<Utc>) -> Result<IssuedToken> {
        let claims = Claims {
            sub: user_id,
            role: role_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| AuthError::Internal(e.to_string()))?;
        let payload = serde_json::to_vec(&claims).map_err(|e| AuthError::Internal(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input)?);

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            claims,
        })
    }

    /// Verify a token's signature and expiry as of `now`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] for anything malformed, a foreign
    ///   algorithm or a bad signature
    /// - [`AuthError::TokenExpired`] once `now` reaches `exp`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let mut parts = token.split('.');
        let (Some(encoded_header), Some(encoded_claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let header: Header = decode_json(encoded_header)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken);
        }

        let expected = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        mac.update(encoded_header.as_bytes());
        mac.update(b".");
        mac.update(encoded_claims.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims: Claims = decode_json(encoded_claims)?;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    fn sign(&self, input: &str) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        mac.update(input.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::new(b"test-secret".to_vec()))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let svc = service();
        let issued = svc.issue(42, 2, noon()).unwrap();
        let claims = svc.verify(&issued.token, noon()).unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, 2);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn each_token_has_a_unique_id() {
        let svc = service();
        let a = svc.issue(1, 1, noon()).unwrap();
        let b = svc.issue(1, 1, noon()).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn expires_after_ttl() {
        let svc = TokenService::new(
            &AuthConfig::new(b"k".to_vec()).with_token_ttl(Duration::from_secs(60)),
        );
        let issued = svc.issue(1, 2, noon()).unwrap();

        let just_before = noon() + chrono::Duration::seconds(59);
        let at_expiry = noon() + chrono::Duration::seconds(60);
        assert!(svc.verify(&issued.token, just_before).is_ok());
        assert_eq!(svc.verify(&issued.token, at_expiry), Err(AuthError::TokenExpired));
    }

    #[test]
    fn rejects_other_secret() {
        let issued = service().issue(1, 2, noon()).unwrap();
        let other = TokenService::new(&AuthConfig::new(b"other".to_vec()));
        assert_eq!(other.verify(&issued.token, noon()), Err(AuthError::InvalidToken));
    }

    #[test]
    fn rejects_tampered_claims() {
        let svc = service();
        let issued = svc.issue(7, 2, noon()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let mut forged = issued.claims.clone();
        forged.role = 1;
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let token = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert_eq!(svc.verify(&token, noon()), Err(AuthError::InvalidToken));
    }

    #[test]
    fn rejects_none_algorithm() {
        let svc = service();
        let issued = svc.issue(7, 1, noon()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let token = format!("{header}.{}.", parts[1]);

        assert_eq!(svc.verify(&token, noon()), Err(AuthError::InvalidToken));
    }

    #[test]
    fn rejects_garbage() {
        let svc = service();
        for bad in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(svc.verify(bad, noon()), Err(AuthError::InvalidToken), "{bad}");
        }
    }
}
