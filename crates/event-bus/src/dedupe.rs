//! Business-key deduplication for handlers whose effect is not idempotent.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// How long a claim is remembered by [`ProcessedKeys::new`].
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How many claims [`ProcessedKeys::new`] remembers at most.
pub const DEFAULT_KEY_CAPACITY: usize = 100_000;

#[derive(Debug, Default)]
struct Claims {
    keys: HashMap<String, Instant>,
    // Claim order, oldest first. An entry is stale when the key was released
    // or re-claimed since; `keys` holds the live claim time.
    order: VecDeque<(String, Instant)>,
}

impl Claims {
    fn evict(&mut self, now: Instant, ttl: Duration, capacity: usize) {
        while let Some((key, claimed_at)) = self.order.front() {
            let live = self.keys.get(key) == Some(claimed_at);
            let expired = now.duration_since(*claimed_at) >= ttl;
            if live && !expired && self.keys.len() < capacity {
                break;
            }
            if live {
                self.keys.remove(key);
            }
            self.order.pop_front();
        }
    }
}

/// Remembers which business keys a consumer has already acted on.
///
/// A handler claims a key before acting; if the action fails it releases
/// the key so a redelivery can try again. Claims are forgotten after a
/// time-to-live, and the oldest claims are dropped once the capacity is
/// reached, so a redelivery arriving later than that is acted on again.
#[derive(Debug, Clone)]
pub struct ProcessedKeys {
    claims: Arc<Mutex<Claims>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ProcessedKeys {
    fn default() -> Self {
        Self::bounded(DEFAULT_KEY_TTL, DEFAULT_KEY_CAPACITY)
    }
}

impl ProcessedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(ttl: Duration, capacity: usize) -> Self {
        Self {
            claims: Arc::default(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Returns true the first time `key` is claimed.
    pub async fn claim(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut claims = self.claims.lock().await;
        claims.evict(now, self.ttl, self.capacity);
        if claims.keys.contains_key(key) {
            return false;
        }
        claims.keys.insert(key.to_string(), now);
        claims.order.push_back((key.to_string(), now));
        true
    }

    /// Forgets a claim after the guarded action failed.
    pub async fn release(&self, key: &str) {
        self.claims.lock().await.keys.remove(key);
    }

    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut claims = self.claims.lock().await;
        claims.evict(now, self.ttl, self.capacity);
        claims.keys.contains_key(key)
    }

    /// Number of live claims.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut claims = self.claims.lock().await;
        claims.evict(now, self.ttl, self.capacity);
        claims.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
