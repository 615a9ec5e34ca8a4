use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const MAX_PENDING: u64 = 10_000;

/// An OAuth dialog we sent a user to and haven't heard back from yet.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// Where the flow continues once the code arrives.
    pub next: String,
    pub issued_at: DateTime<Utc>,
}

/// Single-use `state` values for the OAuth dialog.
///
/// Each state is an unguessable random token that maps to the routing info for
/// the callback. Entries expire after the configured TTL and are removed the
/// first time they are consumed, so a replayed or forged callback is rejected.
#[derive(Clone)]
pub struct PendingAuthorizations {
    cache: Cache<String, PendingAuthorization>,
    ttl: Duration,
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_PENDING)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    pub async fn issue(&self, next: String) -> String {
        let state = Uuid::new_v4().simple().to_string();
        self.cache
            .insert(
                state.clone(),
                PendingAuthorization {
                    next,
                    issued_at: Utc::now(),
                },
            )
            .await;
        state
    }

    pub async fn consume(&self, state: &str) -> Option<PendingAuthorization> {
        let pending = self.cache.remove(state).await?;
        let age = (Utc::now() - pending.issued_at).to_std().unwrap_or_default();
        // The cache evicts lazily, so check the age ourselves too
        if age > self.ttl {
            debug!("Rejecting OAuth state issued {}s ago", age.as_secs());
            return None;
        }
        debug!("Consumed OAuth state issued {}s ago", age.as_secs());
        Some(pending)
    }
}
