//! Typed broadcast payloads for transient (non-persisted) events.
//!
//! Every event the router publishes has an explicit struct so the field
//! contract is checked at compile time instead of assembled as a key-value
//! bag at each call site.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Published on `chat.<conversation_id>.typing`, never to private queues.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TypingEvent {
    pub conversation_id: String,
    pub actor_id: String,
    pub actor_name: String,
    #[serde(rename = "isTyping")]
    pub is_typing: bool,
}

/// Published on `read.<message_id>` after a successful status transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadReceiptEvent {
    pub message_id: Uuid,
    pub reader_id: String,
}

/// Published on the sender's `user.<id>.errors` queue when their send could
/// not be persisted; no other routing happens for that message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendFailureEvent {
    pub error: String,
}

/// Published on `presence.<participant_id>` on actual online/offline
/// transitions only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresenceEvent {
    pub user_id: String,
    pub online: bool,
}
