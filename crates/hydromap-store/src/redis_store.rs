//! Redis-backed result cache.

use async_trait::async_trait;
use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::DelineationResponse;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use crate::ports::{key_digest, ResultCache};

/// Result cache storing JSON values under `<namespace>:<digest>`
#[derive(Clone)]
pub struct RedisResultCache {
    conn: MultiplexedConnection,
    namespace: String,
}

impl std::fmt::Debug for RedisResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisResultCache").field("namespace", &self.namespace).finish()
    }
}

impl RedisResultCache {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str, namespace: impl Into<String>) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| HydroError::Cache(format!("Redis connection failed: {}", e)))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| HydroError::Cache(format!("Redis connection failed: {}", e)))?;

        Ok(Self { conn, namespace: namespace.into() })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store key for a cache key
    pub fn store_key(&self, key: &str) -> String {
        namespaced_key(&self.namespace, key)
    }
}

/// `<namespace>:<digest of key>`
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key_digest(key))
}

#[async_trait]
impl ResultCache for RedisResultCache {
    async fn get(&self, key: &str) -> Result<Option<DelineationResponse>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(self.store_key(key))
            .await
            .map_err(|e| HydroError::Cache(format!("Cache get failed: {}", e)))?;

        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| HydroError::Cache(format!("Corrupt cache entry: {}", e)))
    }

    async fn put(&self, key: &str, response: &DelineationResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(self.store_key(key), json)
            .await
            .map_err(|e| HydroError::Cache(format!("Cache set failed: {}", e)))?;
        Ok(())
    }

    async fn clear(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:*", self.namespace);

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| HydroError::Cache(format!("Pattern search failed: {}", e)))?;

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: usize = conn
            .del(&keys)
            .await
            .map_err(|e| HydroError::Cache(format!("Delete failed: {}", e)))?;

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
