// Redis-backed job store client
//
// Records live as JSON in a list per queue key. `get` claims with an
// atomic LPOP, so concurrent pollers never receive the same record.
// Finalized records are archived under "{key}:completed".

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::models::JobRecord;
use crate::store::JobStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{info, instrument};

/// Job store over a Redis connection manager with automatic reconnection
#[derive(Clone)]
pub struct RedisJobStore {
    manager: ConnectionManager,
}

impl RedisJobStore {
    #[instrument(skip(config))]
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        info!(url = %config.url, "Connecting to job store");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            StoreError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        info!("Job store connection established");
        Ok(Self { manager })
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Health check - ping the store
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.connection();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(format!("Store health check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn get(&self, key: &str) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.connection();
        let payload: Option<String> = conn.lpop(key, None).await.map_err(|e| StoreError::Get {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn requeue(&self, key: &str, record: &JobRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.connection();
        let _: i64 = conn.rpush(key, json).await.map_err(|e| StoreError::Requeue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn completed(&self, key: &str, record: &JobRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let archive_key = format!("{}:completed", key);
        let mut conn = self.connection();
        let _: i64 = conn
            .rpush(&archive_key, json)
            .await
            .map_err(|e| StoreError::Complete {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
