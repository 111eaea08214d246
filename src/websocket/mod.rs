use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::routing::ChannelTransport;

pub mod listener;
pub mod message_types;

/// Unique identifier for a WebSocket subscriber.
///
/// Each connection gets one id covering all of its channel subscriptions,
/// so cleanup on close is precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

#[derive(Default)]
struct RegistryInner {
    // channel name -> subscribers
    channels: HashMap<String, Vec<Subscriber>>,
    // subscriber id -> its sender, for late channel additions
    senders: HashMap<SubscriberId, UnboundedSender<String>>,
}

/// Connection registry: maps logical channel names to live local connections.
///
/// The Delivery Router publishes to channel names; this registry is what
/// turns a name into the set of sockets currently subscribed to it.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a set of channels. All channels share one
    /// receiver; the caller forwards received payloads to its socket.
    pub async fn add_subscriber(
        &self,
        channels: &[String],
    ) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.senders.insert(subscriber_id, tx.clone());
        for channel in channels {
            guard.channels.entry(channel.clone()).or_default().push(Subscriber {
                id: subscriber_id,
                sender: tx.clone(),
            });
        }

        tracing::debug!(
            subscriber = ?subscriber_id,
            channels = channels.len(),
            "registered subscriber"
        );

        (subscriber_id, rx)
    }

    /// Subscribe an existing connection to one more channel.
    /// Returns false if the subscriber is no longer registered.
    pub async fn add_channel(&self, channel: &str, subscriber_id: SubscriberId) -> bool {
        let mut guard = self.inner.write().await;
        let Some(sender) = guard.senders.get(&subscriber_id).cloned() else {
            return false;
        };
        let entry = guard.channels.entry(channel.to_string()).or_default();
        if entry.iter().any(|s| s.id == subscriber_id) {
            return true;
        }
        entry.push(Subscriber {
            id: subscriber_id,
            sender,
        });
        true
    }

    /// Remove a connection from every channel it was subscribed to.
    /// Must be called when the connection closes to avoid leaks.
    pub async fn remove_subscriber(&self, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;
        guard.senders.remove(&subscriber_id);
        guard.channels.retain(|_, subscribers| {
            subscribers.retain(|s| s.id != subscriber_id);
            !subscribers.is_empty()
        });
    }

    /// Deliver a payload to every local subscriber of a channel,
    /// dropping dead senders along the way.
    pub async fn broadcast(&self, channel: &str, payload: String) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.channels.get_mut(channel) {
            subscribers.retain(|s| s.sender.send(payload.clone()).is_ok());
            if subscribers.is_empty() {
                guard.channels.remove(channel);
            }
        }
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let guard = self.inner.read().await;
        guard.channels.get(channel).map(|v| v.len()).unwrap_or(0)
    }
}

/// In-process transport: lets the router fan out directly to local sockets.
/// Used by single-node deployments and tests; multi-node setups publish to
/// Redis instead and feed the registry through the pub/sub listener.
#[async_trait]
impl ChannelTransport for ConnectionRegistry {
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), AppError> {
        self.broadcast(channel, payload.to_string()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_channel_subscriber() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = registry.add_subscriber(&["chat.c1".to_string()]).await;
        let (_b, mut rx_b) = registry.add_subscriber(&["chat.c1".to_string()]).await;
        let (_c, mut rx_c) = registry.add_subscriber(&["chat.c2".to_string()]).await;

        registry.broadcast("chat.c1", "hello".into()).await;

        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn one_connection_subscribes_to_many_channels() {
        let registry = ConnectionRegistry::new();
        let (_id, mut rx) = registry
            .add_subscriber(&["chat.c1".to_string(), "user.u1.messages".to_string()])
            .await;

        registry.broadcast("chat.c1", "a".into()).await;
        registry.broadcast("user.u1.messages", "b".into()).await;

        assert_eq!(rx.recv().await.unwrap(), "a");
        assert_eq!(rx.recv().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn remove_subscriber_cleans_every_channel() {
        let registry = ConnectionRegistry::new();
        let (id, rx) = registry
            .add_subscriber(&["chat.c1".to_string(), "chat.c2".to_string()])
            .await;
        drop(rx);

        registry.remove_subscriber(id).await;

        assert_eq!(registry.subscriber_count("chat.c1").await, 0);
        assert_eq!(registry.subscriber_count("chat.c2").await, 0);
        assert!(!registry.add_channel("chat.c3", id).await);
    }

    #[tokio::test]
    async fn late_channel_addition_shares_the_receiver() {
        let registry = ConnectionRegistry::new();
        let (id, mut rx) = registry.add_subscriber(&["chat.c1".to_string()]).await;

        assert!(registry.add_channel("read.m1", id).await);
        // idempotent
        assert!(registry.add_channel("read.m1", id).await);
        assert_eq!(registry.subscriber_count("read.m1").await, 1);

        registry.broadcast("read.m1", "receipt".into()).await;
        assert_eq!(rx.recv().await.unwrap(), "receipt");
    }

    #[tokio::test]
    async fn dead_senders_are_dropped_on_broadcast() {
        let registry = ConnectionRegistry::new();
        let (_id, rx) = registry.add_subscriber(&["chat.c1".to_string()]).await;
        drop(rx);

        registry.broadcast("chat.c1", "x".into()).await;
        assert_eq!(registry.subscriber_count("chat.c1").await, 0);
    }
}
