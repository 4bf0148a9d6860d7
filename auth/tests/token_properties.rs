//! Property tests for token verification.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rentcar_auth::{AuthConfig, AuthError, TokenService};

fn service() -> TokenService {
    TokenService::new(&AuthConfig::new(b"property-secret".to_vec()))
}

proptest! {
    #[test]
    fn any_user_and_role_round_trip(user in 1i64..1_000_000, role in 1i64..=2) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let svc = service();
        let issued = svc.issue(user, role, now).unwrap();
        let claims = svc.verify(&issued.token, now).unwrap();
        prop_assert_eq!(claims.sub, user);
        prop_assert_eq!(claims.role, role);
    }

    #[test]
    fn flipping_any_character_invalidates(index in any::<prop::sample::Index>()) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let svc = service();
        let token = svc.issue(5, 2, now).unwrap().token;

        let mut bytes = token.into_bytes();
        let i = index.index(bytes.len());
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let result = svc.verify(&tampered, now);
        prop_assert!(matches!(result, Err(AuthError::InvalidToken)), "{result:?}");
    }
}
