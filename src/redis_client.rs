use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to a multiplexed Redis connection.
///
/// `ConnectionManager` reconnects transparently; cloning the manager is cheap
/// and every caller gets the same underlying connection.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: Arc<Mutex<ConnectionManager>>,
}

impl RedisClient {
    pub async fn from_url(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    pub async fn get_multiplexed_async_connection(&self) -> RedisResult<ConnectionManager> {
        let guard = self.manager.lock().await;
        Ok(guard.clone())
    }

    /// Pub/sub needs its own dedicated connection, not the multiplexed one.
    pub async fn pubsub(&self) -> RedisResult<redis::aio::PubSub> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn.into_pubsub())
    }
}
