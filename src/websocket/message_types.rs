use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::MessageDraft;

/// Inbound WebSocket events from client to server.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    /// Send a message: persist first, then fan out. A persistence failure is
    /// reported on the sender's private error queue only.
    #[serde(rename = "send")]
    Send {
        #[serde(flatten)]
        draft: MessageDraft,
    },

    /// Typing indicator; fire-and-forget, never persisted.
    #[serde(rename = "typing")]
    Typing {
        chat_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// Mark a message read. Publishes a receipt only when the status
    /// actually transitions.
    #[serde(rename = "read")]
    MarkRead { message_id: Uuid },

    /// Subscribe this connection to the read-receipt channel of one message.
    #[serde(rename = "subscribe_receipts")]
    SubscribeReceipts { message_id: Uuid },
}
