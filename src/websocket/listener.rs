//! Redis pub/sub listener: forwards channel publishes from any instance into
//! this instance's local connection registry.

use futures_util::StreamExt;
use tokio::time::{sleep, Duration};

use crate::redis_client::RedisClient;
use crate::websocket::ConnectionRegistry;

/// Patterns covering every logical channel namespace the router publishes to.
const CHANNEL_PATTERNS: &[&str] = &["chat.*", "user.*", "group.*", "read.*", "presence.*"];

/// Runs forever; reconnects with a short backoff when the pub/sub
/// connection drops.
pub async fn start_pubsub_listener(redis: RedisClient, registry: ConnectionRegistry) {
    loop {
        if let Err(e) = listen(&redis, &registry).await {
            tracing::error!(error = %e, "pub/sub listener failed, reconnecting");
        } else {
            tracing::warn!("pub/sub stream ended, reconnecting");
        }
        sleep(Duration::from_secs(1)).await;
    }
}

async fn listen(redis: &RedisClient, registry: &ConnectionRegistry) -> redis::RedisResult<()> {
    let mut pubsub = redis.pubsub().await?;
    for pattern in CHANNEL_PATTERNS {
        pubsub.psubscribe(*pattern).await?;
    }
    tracing::info!("pub/sub listener subscribed to channel patterns");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let channel = msg.get_channel_name().to_string();
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, channel = %channel, "non-string payload dropped");
                continue;
            }
        };
        registry.broadcast(&channel, payload).await;
    }

    Ok(())
}
