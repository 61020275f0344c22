//! Temporary handshake state kept between the two legs of the flow.

use crate::codec::StateTokenCodec;
use crate::error::{OAuth1Error, OAuth1Result};
use crate::types::RequestToken;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

/// Session-scoped key/value storage with per-entry expiry.
///
/// This is the host's capability (a session cookie, a cache, ...). Entries are
/// only visible to the session that wrote them and read as `None` once their
/// TTL has elapsed.
#[async_trait]
pub trait TemporaryStore: Send + Sync {
    async fn put(
        &self,
        session_id: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> OAuth1Result<()>;

    async fn get(&self, session_id: &str, key: &str) -> OAuth1Result<Option<String>>;

    async fn remove(&self, session_id: &str, key: &str) -> OAuth1Result<()>;

    /// Remove an entry and return its value if it had not expired.
    ///
    /// Must be atomic: of any number of concurrent calls for the same entry at
    /// most one sees `Some`.
    async fn take(&self, session_id: &str, key: &str) -> OAuth1Result<Option<String>>;
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of TemporaryStore
pub struct InMemoryTemporaryStore {
    entries: Arc<RwLock<HashMap<(String, String), StoredEntry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTemporaryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryTemporaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemporaryStore for InMemoryTemporaryStore {
    async fn put(
        &self,
        session_id: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> OAuth1Result<()> {
        let expires_at = self.clock.now().checked_add_signed(ttl).ok_or_else(|| {
            OAuth1Error::ConfigError(format!("TTL of {} seconds is out of range", ttl.num_seconds()))
        })?;
        let mut entries = self.entries.write().await;
        entries.insert(
            (session_id.to_string(), key.to_string()),
            StoredEntry { value, expires_at },
        );
        Ok(())
    }

    async fn get(&self, session_id: &str, key: &str) -> OAuth1Result<Option<String>> {
        let entries = self.entries.read().await;
        let now = self.clock.now();

        Ok(entries
            .get(&(session_id.to_string(), key.to_string()))
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone()))
    }

    async fn remove(&self, session_id: &str, key: &str) -> OAuth1Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }

    async fn take(&self, session_id: &str, key: &str) -> OAuth1Result<Option<String>> {
        let mut entries = self.entries.write().await;
        let now = self.clock.now();

        Ok(entries
            .remove(&(session_id.to_string(), key.to_string()))
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value))
    }
}

/// Stashes the request token of a started handshake, encrypted, under a fixed
/// provider-scoped key.
#[derive(Clone)]
pub struct PendingTokenStore {
    store: Arc<dyn TemporaryStore>,
    codec: StateTokenCodec,
    key: String,
    ttl: Duration,
}

impl PendingTokenStore {
    pub fn new(
        store: Arc<dyn TemporaryStore>,
        codec: StateTokenCodec,
        provider_id: &str,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            codec,
            key: Self::state_key(provider_id),
            ttl,
        }
    }

    /// The key the pending request token is stored under for a provider.
    pub fn state_key(provider_id: &str) -> String {
        format!("ras.oauth1.{}.rtoken", provider_id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn stash(&self, session_id: &str, token: &RequestToken) -> OAuth1Result<()> {
        let encoded = self.codec.encode(token)?;
        debug!("Storing pending request token {} under {}", token.token, self.key);
        self.store
            .put(session_id, &self.key, encoded, self.ttl)
            .await
    }

    /// Fetch and remove the pending request token. `Ok(None)` when nothing is
    /// pending (never stored, expired or already consumed).
    pub async fn take(&self, session_id: &str) -> OAuth1Result<Option<RequestToken>> {
        let raw = self.store.take(session_id, &self.key).await?;
        self.codec.decode(raw.as_deref())
    }
}
