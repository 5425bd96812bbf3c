// libs/entitlement-cell/src/services/cache.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{AccessStatus, CachedAccess};

/// In-memory access cache keyed by user id.
///
/// A hit requires the stored bearer token to be byte-identical to the one
/// presented: a rotated token always re-resolves, and a repeated check with
/// the same token inside the TTL never touches the backend.
pub struct AccessCache {
    entries: Arc<RwLock<HashMap<String, CachedAccess>>>,
    ttl: Duration,
}

impl Default for AccessCache {
    fn default() -> Self {
        Self::new(60)
    }
}

impl AccessCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub async fn lookup(&self, user_id: &str, token: &str) -> Option<AccessStatus> {
        let entries = self.entries.read().await;
        let entry = entries.get(user_id)?;

        if entry.token != token {
            debug!("Access cache miss for {}: token rotated", user_id);
            return None;
        }

        if Utc::now() - entry.resolved_at > self.ttl {
            debug!("Access cache miss for {}: entry stale", user_id);
            return None;
        }

        Some(entry.status.clone())
    }

    pub async fn store(&self, user_id: &str, token: &str, status: AccessStatus) {
        let mut entries = self.entries.write().await;
        entries.insert(
            user_id.to_string(),
            CachedAccess {
                token: token.to_string(),
                status,
                resolved_at: Utc::now(),
            },
        );
    }

    pub async fn invalidate(&self, user_id: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(user_id);
    }
}

impl Clone for AccessCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}
