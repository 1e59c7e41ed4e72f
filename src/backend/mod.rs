//! The credit-accounting backend interface and its implementations.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use memory::MemoryBackend;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisBackend;

/// The outcome of one atomic `hit` against a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_seconds: u64,
}

/// A backend failure: timeout, connection loss, or a malformed reply from
/// the store. The hit handler treats every variant identically, applying
/// its configured fail-open or fail-closed policy rather than tearing the
/// connection down.
#[derive(Debug)]
pub struct BackendError(pub String);

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend unavailable: {}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// Atomic keyed credit accounting, delegated to an external collaborator.
///
/// Implementations must be atomic per key: concurrent `hit` calls against
/// the same key must not allow more than `limit` successful decrements per
/// `ttl_seconds` window.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn hit(&self, key: &[u8], limit: u64, ttl_seconds: u64) -> Result<HitOutcome, BackendError>;
}
