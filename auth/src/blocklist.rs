//! Revoked token ids.
//!
//! Logging out revokes the token's `jti` until the token would have expired
//! anyway. Entries past their expiry are pruned lazily.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Store of revoked token ids.
#[async_trait]
pub trait TokenBlocklist: Send + Sync {
    /// Revoke `jti` until `expires_at`.
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>);

    /// Whether `jti` is currently revoked.
    async fn is_revoked(&self, jti: Uuid, now: DateTime<Utc>) -> bool;
}

/// Process-local blocklist.
///
/// Sufficient for a single instance. Revocations are lost on restart, which
/// is bounded by the token TTL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlocklist {
    entries: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
}

impl InMemoryBlocklist {
    /// Empty blocklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked revocations, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenBlocklist for InMemoryBlocklist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::error!("token blocklist lock poisoned");
            return;
        };
        let now = Utc::now();
        entries.retain(|_, exp| *exp > now);
        entries.insert(jti, expires_at);
    }

    async fn is_revoked(&self, jti: Uuid, now: DateTime<Utc>) -> bool {
        // A poisoned lock fails closed.
        let Ok(entries) = self.entries.lock() else {
            return true;
        };
        entries.get(&jti).is_some_and(|exp| *exp > now)
    }
}
