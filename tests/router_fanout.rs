//! End-to-end fan-out through the in-process transport: router -> connection
//! registry -> per-connection receivers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use chat_delivery_service::models::{Message, MessageKind, MessageStatus};
use chat_delivery_service::routing::router::read_receipt;
use chat_delivery_service::routing::{DeliveryRouter, TypingEvent};
use chat_delivery_service::websocket::ConnectionRegistry;

fn message(chat_id: &str, sender: &str, receiver: Option<&str>, group: Option<&str>) -> Message {
    Message {
        id: Uuid::new_v4(),
        chat_id: chat_id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.map(|r| r.to_string()),
        group_id: group.map(|g| g.to_string()),
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
async fn direct_message_reaches_room_and_private_queues_once_each() {
    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(registry.clone()));

    // u1 is viewing the conversation; u2 is on another screen, only their
    // private queue is live
    let (_a, mut room_rx) = registry
        .add_subscriber(&["chat.direct_u1_u2".to_string()])
        .await;
    let (_b, mut queue_rx) = registry
        .add_subscriber(&["user.u2.messages".to_string()])
        .await;

    let msg = message("direct_u1_u2", "u1", Some("u2"), None);
    let outcome = router.route_message(&msg).await;

    assert!(!outcome.is_partial());
    assert_eq!(
        outcome.published,
        vec![
            "chat.direct_u1_u2".to_string(),
            "user.u1.messages".to_string(),
            "user.u2.messages".to_string(),
        ]
    );

    let room_payload: serde_json::Value =
        serde_json::from_str(&room_rx.recv().await.unwrap()).unwrap();
    assert_eq!(room_payload["id"], msg.id.to_string());

    // the explicit receiver rule must not double-deliver on the same channel
    let queue_payload = queue_rx.recv().await.unwrap();
    assert!(queue_rx.try_recv().is_err());
    let queue_payload: serde_json::Value = serde_json::from_str(&queue_payload).unwrap();
    assert_eq!(queue_payload["id"], msg.id.to_string());
}

#[tokio::test]
async fn subscriber_on_room_and_queue_can_dedup_by_message_id() {
    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(registry.clone()));

    // one connection subscribed to both the room and its own queue receives
    // the payload twice, with the same message id for client-side dedup
    let (_id, mut rx) = registry
        .add_subscriber(&[
            "chat.direct_u1_u2".to_string(),
            "user.u1.messages".to_string(),
        ])
        .await;

    let msg = message("direct_u1_u2", "u2", None, None);
    router.route_message(&msg).await;

    let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(first["id"], second["id"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn group_message_reaches_group_channel_subscribers() {
    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(registry.clone()));

    let (_id, mut rx) = registry.add_subscriber(&["group.g1".to_string()]).await;

    let msg = message("g1", "u1", None, Some("g1"));
    let outcome = router.route_message(&msg).await;

    assert_eq!(
        outcome.published,
        vec!["chat.g1".to_string(), "group.g1".to_string()]
    );
    assert!(rx.recv().await.is_some());
}

#[tokio::test]
async fn typing_event_stays_off_private_queues() {
    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(registry.clone()));

    let (_a, mut typing_rx) = registry
        .add_subscriber(&["chat.direct_u1_u2.typing".to_string()])
        .await;
    let (_b, mut queue_rx) = registry
        .add_subscriber(&["user.u2.messages".to_string()])
        .await;

    router
        .route_typing(&TypingEvent {
            conversation_id: "direct_u1_u2".into(),
            actor_id: "u1".into(),
            actor_name: "User One".into(),
            is_typing: true,
        })
        .await;

    let payload: serde_json::Value =
        serde_json::from_str(&typing_rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload["actor_id"], "u1");
    assert_eq!(payload["isTyping"], true);
    assert!(queue_rx.try_recv().is_err());
}

#[tokio::test]
async fn read_receipt_reaches_per_message_subscribers() {
    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(registry.clone()));

    let message_id = Uuid::new_v4();
    let (_id, mut rx) = registry
        .add_subscriber(&[format!("read.{message_id}")])
        .await;

    router
        .route_read_receipt(&read_receipt(message_id, "u2"))
        .await;

    let payload: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(payload["message_id"], message_id.to_string());
    assert_eq!(payload["reader_id"], "u2");
}
