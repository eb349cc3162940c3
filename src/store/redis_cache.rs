/// Redis-backed TTL cache
///
/// Each named map is a key prefix; entries are written with `SET ... EX`
/// so Redis drops them on expiry. Every process pointed at the same Redis
/// sees the same entries.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::store::{CacheError, TtlCache};

#[derive(Clone)]
pub struct RedisTtlCache {
    connection: MultiplexedConnection,
    maps: Arc<HashMap<String, Duration>>,
}

impl RedisTtlCache {
    /// Connect to `redis_uri` with exactly the given `(name, ttl)` maps.
    /// Any other map name is reported as unavailable.
    pub async fn connect(redis_uri: &str, maps: &[(&str, Duration)]) -> Result<Self, CacheError> {
        tracing::info!("Attempting to connect to Redis");
        let client = Client::open(redis_uri).map_err(|e| {
            tracing::error!("Invalid Redis URI: {}", e);
            CacheError::Unavailable(format!("invalid Redis URI: {}", e))
        })?;
        let connection = client.get_multiplexed_async_connection().await.map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            CacheError::Unavailable(format!("Redis connection: {}", e))
        })?;
        tracing::info!("Redis connection established");

        let maps = maps
            .iter()
            .map(|(name, ttl)| (name.to_string(), *ttl))
            .collect();
        Ok(Self {
            connection,
            maps: Arc::new(maps),
        })
    }

    fn ttl(&self, map: &str) -> Result<Duration, CacheError> {
        self.maps
            .get(map)
            .copied()
            .ok_or_else(|| CacheError::Unavailable(map.to_string()))
    }

    fn entry_key(map: &str, key: &str) -> String {
        format!("{}:{}", map, key)
    }

    async fn fetch(&self, command: &str, map: &str, key: &str) -> Result<Option<Uuid>, CacheError> {
        self.ttl(map)?;
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd(command)
            .arg(Self::entry_key(map, key))
            .query_async(&mut conn)
            .await
            .map_err(|e| backend_down(map, e))?;

        match value {
            Some(raw) => Uuid::parse_str(&raw).map(Some).map_err(|e| {
                tracing::error!(map = %map, "Malformed cache entry: {}", e);
                CacheError::Unavailable(format!("{}: malformed entry", map))
            }),
            None => Ok(None),
        }
    }
}

fn backend_down(map: &str, err: redis::RedisError) -> CacheError {
    tracing::error!(map = %map, "Redis command failed: {}", err);
    CacheError::Unavailable(format!("{}: {}", map, err))
}

#[async_trait]
impl TtlCache for RedisTtlCache {
    async fn put(&self, map: &str, key: &str, user_id: Uuid) -> Result<(), CacheError> {
        // Redis expiry has second granularity.
        let seconds = self.ttl(map)?.as_secs().max(1);
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(Self::entry_key(map, key))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| backend_down(map, e))
    }

    async fn get(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError> {
        self.fetch("GET", map, key).await
    }

    /// Atomic read-and-delete; at most one caller gets the entry.
    async fn remove(&self, map: &str, key: &str) -> Result<Option<Uuid>, CacheError> {
        self.fetch("GETDEL", map, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key_is_prefixed_by_map() {
        assert_eq!(
            RedisTtlCache::entry_key("resetPasswordToken", "abc"),
            "resetPasswordToken:abc"
        );
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_unavailable() {
        let result = RedisTtlCache::connect("redis://127.0.0.1:1", &[("m", Duration::from_secs(1))]).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_uri_is_unavailable() {
        let result = RedisTtlCache::connect("not a uri", &[]).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }
}
