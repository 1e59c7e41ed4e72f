//! In-memory reference backend.
//!
//! Process-local and lost on restart: bucket state lives only in this
//! instance's `HashMap`, never shared across a fleet of `divvy-server`
//! processes. Default backend, and the one every test in this repository
//! runs against.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::{Backend, BackendError, HitOutcome};

struct Bucket {
    remaining: u64,
    expires_at: Instant,
}

/// An atomic, in-process credit store keyed by opaque bytes.
#[derive(Clone)]
pub struct MemoryBackend {
    buckets: Arc<Mutex<HashMap<Vec<u8>, Bucket>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run forever, periodically dropping buckets whose window has expired.
    /// Not required for correctness (expiry is also checked lazily on
    /// access) but keeps memory bounded under a long-lived process with a
    /// high-cardinality actor field.
    pub async fn run_eviction_sweep(self, interval: Duration) {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            let now = Instant::now();
            let mut buckets = self.buckets.lock();
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.expires_at > now);
            let evicted = before - buckets.len();
            if evicted > 0 {
                debug!(evicted, remaining = buckets.len(), "evicted expired buckets");
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn hit(&self, key: &[u8], limit: u64, ttl_seconds: u64) -> Result<HitOutcome, BackendError> {
        let now = Instant::now();
        let ttl = Duration::from_secs(ttl_seconds);
        let mut buckets = self.buckets.lock();

        let bucket = buckets.entry(key.to_vec()).or_insert_with(|| Bucket {
            remaining: limit,
            expires_at: now + ttl,
        });

        if bucket.expires_at <= now {
            bucket.remaining = limit;
            bucket.expires_at = now + ttl;
        }

        let reset_seconds = bucket.expires_at.saturating_duration_since(now).as_secs();

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            Ok(HitOutcome {
                allowed: true,
                remaining: bucket.remaining,
                reset_seconds,
            })
        } else {
            Ok(HitOutcome {
                allowed: false,
                remaining: 0,
                reset_seconds,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let backend = MemoryBackend::new();
        for _ in 0..3 {
            let outcome = backend.hit(b"key", 3, 60).await.unwrap();
            assert!(outcome.allowed);
        }
        let outcome = backend.hit(b"key", 3, 60).await.unwrap();
        assert!(!outcome.allowed);
        assert_eq!(outcome.remaining, 0);
    }

    #[tokio::test]
    async fn separate_keys_have_independent_buckets() {
        let backend = MemoryBackend::new();
        let a = backend.hit(b"a", 1, 60).await.unwrap();
        let b = backend.hit(b"b", 1, 60).await.unwrap();
        assert!(a.allowed);
        assert!(b.allowed);
    }

    #[tokio::test]
    async fn window_resets_after_ttl_elapses() {
        let backend = MemoryBackend::new();
        assert!(backend.hit(b"key", 1, 0).await.unwrap().allowed);
        // ttl_seconds=0 means the window is already expired on the next hit.
        assert!(backend.hit(b"key", 1, 0).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn zero_limit_denies_immediately() {
        let backend = MemoryBackend::new();
        let outcome = backend.hit(b"key", 0, 60).await.unwrap();
        assert!(!outcome.allowed);
    }
}
