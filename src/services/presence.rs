//! Presence: a TTL key per online participant, refreshed by the WebSocket
//! heartbeat. Transitions (not refreshes) are announced on the participant's
//! presence channel, so consumers see explicit online/offline events instead
//! of polling a mutable flag.

use redis::AsyncCommands;

use crate::error::AppResult;
use crate::redis_client::RedisClient;
use crate::routing::{DeliveryRouter, PresenceEvent};

fn presence_key(participant_id: &str) -> String {
    format!("presence:{participant_id}")
}

#[derive(Clone)]
pub struct PresenceService {
    redis: RedisClient,
    router: DeliveryRouter,
    ttl_secs: u64,
}

impl PresenceService {
    pub fn new(redis: RedisClient, router: DeliveryRouter, ttl_secs: u64) -> Self {
        Self {
            redis,
            router,
            ttl_secs,
        }
    }

    /// Mark a participant online (or refresh their TTL). Publishes a
    /// transition event only when the key did not exist before.
    pub async fn mark_online(&self, participant_id: &str) -> AppResult<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let key = presence_key(participant_id);

        let newly_online: bool = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, Option<String>>(&mut conn)
            .await?
            .is_some();

        if newly_online {
            self.router
                .route_presence(&PresenceEvent {
                    user_id: participant_id.to_string(),
                    online: true,
                })
                .await;
        } else {
            // already online: refresh the TTL only
            conn.expire::<_, ()>(&key, self.ttl_secs as i64).await?;
        }
        Ok(())
    }

    /// Mark a participant offline. Publishes a transition event only when
    /// they were actually online.
    pub async fn mark_offline(&self, participant_id: &str) -> AppResult<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let removed: i64 = conn.del(presence_key(participant_id)).await?;

        if removed > 0 {
            self.router
                .route_presence(&PresenceEvent {
                    user_id: participant_id.to_string(),
                    online: false,
                })
                .await;
        }
        Ok(())
    }

    pub async fn is_online(&self, participant_id: &str) -> AppResult<bool> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let exists: bool = conn.exists(presence_key(participant_id)).await?;
        Ok(exists)
    }
}
