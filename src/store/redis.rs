use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use tracing::{debug, info};

use super::{StateStore, StoreError};
use crate::config::StoreConfig;

/// Redis-backed blob store using a pooled async connection
#[derive(Clone)]
pub struct RedisStateStore {
    pool: Pool,
}

impl std::fmt::Debug for RedisStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStateStore")
            .field("pool_status", &self.pool.status())
            .finish()
    }
}

impl RedisStateStore {
    /// Build the connection pool. No connection is opened until first use.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut cfg = Config::from_url(config.redis_url.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_max));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Open a connection and touch `key` so a misconfigured Redis fails at startup
    pub async fn verify_connection(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let exists: bool = conn
            .exists(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        info!(key = %key, exists, "Connected to Redis successfully");
        Ok(())
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(key = %key, found = value.is_some(), "Read blob from Redis");
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let bytes = value.len();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(key = %key, bytes, "Wrote blob to Redis");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
