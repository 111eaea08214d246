use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_postgres::Row;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            "file" => Some(MessageKind::File),
            _ => None,
        }
    }
}

/// Delivery lifecycle of a message. Advances only forward:
/// sent -> delivered -> read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MessageStatus::Sent => 0,
            MessageStatus::Delivered => 1,
            MessageStatus::Read => 2,
        }
    }

    /// Status never regresses.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        next.rank() > self.rank()
    }
}

/// One participant's reaction. A new reaction from the same participant
/// replaces the previous one; the map key is the participant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reaction {
    pub emoji: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub reacted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub group_id: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub status: MessageStatus,
    /// participant id -> reaction, one entry per participant
    pub reactions: BTreeMap<String, Reaction>,
    pub pinned: bool,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn from_row(row: &Row) -> Result<Self, AppError> {
        let kind_str: String = row.get("kind");
        let kind = MessageKind::from_db(&kind_str)
            .ok_or_else(|| AppError::Database(format!("invalid message kind: {kind_str}")))?;
        let status_str: String = row.get("status");
        let status = MessageStatus::from_db(&status_str)
            .ok_or_else(|| AppError::Database(format!("invalid message status: {status_str}")))?;

        let reactions_json: serde_json::Value = row.get("reactions");
        let reactions: BTreeMap<String, Reaction> = serde_json::from_value(reactions_json)
            .map_err(|e| AppError::Database(format!("invalid reactions payload: {e}")))?;

        Ok(Message {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            group_id: row.get("group_id"),
            content: row.get("content"),
            kind,
            status,
            reactions,
            pinned: row.get("pinned"),
            file_url: row.get("file_url"),
            file_name: row.get("file_name"),
            file_size: row.get("file_size"),
            created_at: row.get("created_at"),
            edited_at: row.get("edited_at"),
        })
    }
}
