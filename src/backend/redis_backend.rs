//! A `Backend` implementation backed by a real Redis (or Redis-protocol
//! compatible) instance, gated behind the `redis-backend` feature.

use redis::Client;

use super::{Backend, BackendError, HitOutcome};

/// Atomically increments the bucket counter and reads its TTL in a single
/// round trip. `EXPIRE` is only (re)armed on the first hit of a window so a
/// client can't reset its own window early by hitting repeatedly.
const HIT_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[2])
end
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
  ttl = tonumber(ARGV[2])
end
local limit = tonumber(ARGV[1])
local remaining = limit - current
local allowed = 1
if remaining < 0 then
  allowed = 0
  remaining = 0
end
return {allowed, remaining, ttl}
"#;

pub struct RedisBackend {
    client: Client,
}

impl RedisBackend {
    /// `addr` is a bare `host:port` (the form `DIVVY_BACKEND_ADDR` is
    /// documented to take) or an already-schemed URL
    /// (`redis://`/`rediss://`/`unix://`); either is accepted.
    pub fn new(addr: &str) -> Result<Self, BackendError> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{}", addr)
        };
        let client = Client::open(url).map_err(|e| BackendError(e.to_string()))?;
        Ok(RedisBackend { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_is_given_a_redis_scheme() {
        assert!(RedisBackend::new("127.0.0.1:6379").is_ok());
    }

    #[test]
    fn already_schemed_url_is_passed_through() {
        assert!(RedisBackend::new("redis://127.0.0.1:6379").is_ok());
        assert!(RedisBackend::new("unix:///tmp/redis.sock").is_ok());
    }
}

#[async_trait::async_trait]
impl Backend for RedisBackend {
    async fn hit(&self, key: &[u8], limit: u64, ttl_seconds: u64) -> Result<HitOutcome, BackendError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BackendError(e.to_string()))?;

        let (allowed, remaining, ttl): (i64, i64, i64) = redis::Script::new(HIT_SCRIPT)
            .key(key)
            .arg(limit)
            .arg(ttl_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| BackendError(e.to_string()))?;

        Ok(HitOutcome {
            allowed: allowed != 0,
            remaining: remaining.max(0) as u64,
            reset_seconds: ttl.max(0) as u64,
        })
    }
}
