use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use utoipa::ToSchema;

use crate::error::AppError;

/// Namespace prefix of derived direct-conversation ids. The Delivery Router
/// pattern-matches on it, so it is part of the wire contract.
pub const DIRECT_CHAT_PREFIX: &str = "direct_";

const ID_SEPARATOR: char = '_';

/// Derive the canonical id for a direct conversation between two participants.
///
/// Pure and symmetric: both sides of a first-contact race compute the same id,
/// so create-or-get reduces to an idempotent upsert instead of a
/// check-then-act. Ids containing the separator are rejected because the
/// router parses the participant ids back out of the chat id.
pub fn direct_chat_id(p1: &str, p2: &str) -> Result<String, AppError> {
    if p1.is_empty() || p2.is_empty() {
        return Err(AppError::InvalidArgument(
            "participant id must not be empty".into(),
        ));
    }
    if p1 == p2 {
        return Err(AppError::InvalidArgument(
            "cannot open a direct chat with yourself".into(),
        ));
    }
    if p1.contains(ID_SEPARATOR) || p2.contains(ID_SEPARATOR) {
        return Err(AppError::InvalidArgument(
            "participant id must not contain '_'".into(),
        ));
    }

    let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
    Ok(format!("{DIRECT_CHAT_PREFIX}{lo}{ID_SEPARATOR}{hi}"))
}

/// Parse the two participant ids embedded in a direct-conversation id.
/// Returns `None` for anything outside the `direct_` namespace.
pub fn split_direct_chat_id(chat_id: &str) -> Option<(&str, &str)> {
    let rest = chat_id.strip_prefix(DIRECT_CHAT_PREFIX)?;
    let (a, b) = rest.split_once(ID_SEPARATOR)?;
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a, b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Direct => "direct",
            ChatKind::Group => "group",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(ChatKind::Direct),
            "group" => Some(ChatKind::Group),
            _ => None,
        }
    }
}

/// A conversation record: a direct chat (exactly two participants, derived id)
/// or a group (arbitrary membership, server-generated id, owner + metadata).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Chat {
    pub id: String,
    pub kind: ChatKind,
    pub participants: Vec<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Chat {
    pub fn from_row(row: &Row) -> Result<Self, AppError> {
        let kind_str: String = row.get("kind");
        let kind = ChatKind::from_db(&kind_str)
            .ok_or_else(|| AppError::Database(format!("invalid chat kind: {kind_str}")))?;
        Ok(Chat {
            id: row.get("id"),
            kind,
            participants: row.get("participants"),
            name: row.get("name"),
            description: row.get("description"),
            avatar_url: row.get("avatar_url"),
            owner_id: row.get("owner_id"),
            created_at: row.get("created_at"),
            last_activity: row.get("last_activity"),
        })
    }

    pub fn is_participant(&self, participant_id: &str) -> bool {
        self.participants.iter().any(|p| p == participant_id)
    }
}
