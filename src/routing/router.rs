//! The Delivery Router: maps one persisted message (or one transient event)
//! to its set of logical channels and publishes to each exactly once.
//!
//! Persistence is the durability boundary: the router is only invoked after a
//! successful store write, and a failed publish on one channel never rolls
//! anything back or blocks the remaining channels; the message is still
//! retrievable through history.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Message;
use crate::redis_client::RedisClient;
use crate::routing::channels;
use crate::routing::events::{PresenceEvent, ReadReceiptEvent, SendFailureEvent, TypingEvent};

/// Seam between the router and the messaging transport. The router only knows
/// logical channel names; fan-out to live sockets is the connection
/// registry's problem.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError>;
}

/// Production transport: PUBLISH to Redis. A pub/sub listener on every
/// instance forwards matching payloads into its local connection registry.
pub struct RedisTransport {
    redis: RedisClient,
}

impl RedisTransport {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ChannelTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }
}

/// Per-call result of a fan-out. A non-empty `failed` list is a partial
/// delivery: logged and observable, never surfaced as a failure of the
/// request that triggered it.
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub published: Vec<String>,
    pub failed: Vec<String>,
}

impl DeliveryOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct DeliveryRouter {
    transport: Arc<dyn ChannelTransport>,
}

impl DeliveryRouter {
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        Self { transport }
    }

    /// Fan a just-persisted message out to its computed channel set.
    pub async fn route_message(&self, message: &Message) -> DeliveryOutcome {
        let payload = match serde_json::to_string(message) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, message_id = %message.id, "failed to serialize message for fan-out");
                return DeliveryOutcome::default();
            }
        };
        self.publish_all(channels::message_channels(message), &payload)
            .await
    }

    /// Typing indicators go to the conversation's typing channel only.
    /// No persistence, no retry; a dropped indicator is expected loss.
    pub async fn route_typing(&self, event: &TypingEvent) -> DeliveryOutcome {
        self.publish_event(channels::typing_channel(&event.conversation_id), event)
            .await
    }

    /// Read receipts go to the per-message receipt channel.
    pub async fn route_read_receipt(&self, event: &ReadReceiptEvent) -> DeliveryOutcome {
        self.publish_event(channels::read_receipt_channel(event.message_id), event)
            .await
    }

    /// Presence transitions go to the participant's presence channel.
    pub async fn route_presence(&self, event: &PresenceEvent) -> DeliveryOutcome {
        self.publish_event(channels::presence_channel(&event.user_id), event)
            .await
    }

    /// A send that failed before persistence is reported only on the
    /// sender's private error queue; nothing else is routed.
    pub async fn route_send_failure(&self, sender_id: &str, error: &AppError) -> DeliveryOutcome {
        let event = SendFailureEvent {
            error: error.to_string(),
        };
        self.publish_event(channels::user_error_queue(sender_id), &event)
            .await
    }

    async fn publish_event<E: Serialize>(&self, channel: String, event: &E) -> DeliveryOutcome {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, channel = %channel, "failed to serialize event for fan-out");
                return DeliveryOutcome::default();
            }
        };
        self.publish_all(vec![channel], &payload).await
    }

    async fn publish_all(&self, channels: Vec<String>, payload: &str) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        for channel in channels {
            match self.transport.publish(&channel, payload).await {
                Ok(()) => outcome.published.push(channel),
                Err(e) => {
                    warn!(error = %e, channel = %channel, "publish failed, continuing with remaining channels");
                    outcome.failed.push(channel);
                }
            }
        }
        if outcome.is_partial() {
            warn!(
                failed = outcome.failed.len(),
                published = outcome.published.len(),
                "partial delivery"
            );
        }
        outcome
    }
}

/// Convenience constructor for the per-message read-receipt event.
pub fn read_receipt(message_id: Uuid, reader_id: &str) -> ReadReceiptEvent {
    ReadReceiptEvent {
        message_id,
        reader_id: reader_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, MessageStatus};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    /// Captures publishes; channels listed in `fail_on` error out.
    #[derive(Default)]
    struct RecordingTransport {
        published: Mutex<Vec<(String, String)>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl ChannelTransport for RecordingTransport {
        async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
            if self.fail_on.iter().any(|c| c == channel) {
                return Err(AppError::Transport("connection reset".into()));
            }
            self.published
                .lock()
                .await
                .push((channel.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn direct_message() -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: "direct_u1_u2".into(),
            sender_id: "u1".into(),
            receiver_id: Some("u2".into()),
            group_id: None,
            content: "hello".into(),
            kind: MessageKind::Text,
            status: MessageStatus::Sent,
            reactions: BTreeMap::new(),
            pinned: false,
            file_url: None,
            file_name: None,
            file_size: None,
            created_at: Utc::now(),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn routes_message_to_every_channel_exactly_once() {
        let transport = Arc::new(RecordingTransport::default());
        let router = DeliveryRouter::new(transport.clone());

        let outcome = router.route_message(&direct_message()).await;
        assert!(!outcome.is_partial());

        let published = transport.published.lock().await;
        let channels: Vec<&str> = published.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(
            channels,
            vec!["chat.direct_u1_u2", "user.u1.messages", "user.u2.messages"]
        );
        // same payload everywhere
        assert!(published.windows(2).all(|w| w[0].1 == w[1].1));
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_block_the_rest() {
        let transport = Arc::new(RecordingTransport {
            fail_on: vec!["user.u1.messages".into()],
            ..Default::default()
        });
        let router = DeliveryRouter::new(transport.clone());

        let outcome = router.route_message(&direct_message()).await;
        assert!(outcome.is_partial());
        assert_eq!(outcome.failed, vec!["user.u1.messages".to_string()]);
        assert_eq!(
            outcome.published,
            vec![
                "chat.direct_u1_u2".to_string(),
                "user.u2.messages".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn typing_goes_only_to_the_typing_channel() {
        let transport = Arc::new(RecordingTransport::default());
        let router = DeliveryRouter::new(transport.clone());

        router
            .route_typing(&TypingEvent {
                conversation_id: "direct_u1_u2".into(),
                actor_id: "u1".into(),
                actor_name: "User One".into(),
                is_typing: true,
            })
            .await;

        let published = transport.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "chat.direct_u1_u2.typing");
        let payload: serde_json::Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(payload["isTyping"], true);
    }

    #[tokio::test]
    async fn send_failure_reports_only_to_sender_error_queue() {
        let transport = Arc::new(RecordingTransport::default());
        let router = DeliveryRouter::new(transport.clone());

        router
            .route_send_failure("u1", &AppError::NotFound)
            .await;

        let published = transport.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "user.u1.errors");
    }

    #[tokio::test]
    async fn read_receipt_targets_the_message_channel() {
        let transport = Arc::new(RecordingTransport::default());
        let router = DeliveryRouter::new(transport.clone());

        let id = Uuid::new_v4();
        router.route_read_receipt(&read_receipt(id, "u2")).await;

        let published = transport.published.lock().await;
        assert_eq!(published[0].0, format!("read.{id}"));
    }
}
