//! Message Store: owns persisted message records and the per-message state
//! machine (edit/delete authorization, reaction merge, pin toggle, read
//! transition), plus paginated history and substring search.

use chrono::Utc;
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageKind, Reaction};

const MAX_PAGE_SIZE: i64 = 200;

/// Client-supplied fields of a new message. The stored record returned by
/// `append`, not this draft, is the source of truth for routing, since it
/// carries the generated id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDraft {
    pub chat_id: String,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

#[derive(Debug)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub total: i64,
}

pub struct MessageService;

impl MessageService {
    /// Persist a new message. Assigns id, timestamp, `sent` status, empty
    /// reactions; bumps the conversation's last-activity clock.
    pub async fn append(db: &Pool, draft: &MessageDraft, sender_id: &str) -> AppResult<Message> {
        if draft.chat_id.is_empty() {
            return Err(AppError::InvalidArgument("chat_id is required".into()));
        }
        if draft.content.is_empty() && draft.file_url.is_none() {
            return Err(AppError::InvalidArgument(
                "message needs content or a file".into(),
            ));
        }

        let client = db.get().await?;

        let chat = client
            .query_opt(
                "SELECT participants FROM conversations WHERE id = $1",
                &[&draft.chat_id],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        let participants: Vec<String> = chat.get("participants");
        if !participants.iter().any(|p| p == sender_id) {
            return Err(AppError::Unauthorized);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = client
            .query_one(
                r#"
                INSERT INTO messages (
                    id, chat_id, sender_id, receiver_id, group_id,
                    content, kind, status, reactions, pinned,
                    file_url, file_name, file_size, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'sent', '{}'::jsonb, FALSE, $8, $9, $10, $11)
                RETURNING *
                "#,
                &[
                    &id,
                    &draft.chat_id,
                    &sender_id,
                    &draft.receiver_id,
                    &draft.group_id,
                    &draft.content,
                    &draft.kind.as_str(),
                    &draft.file_url,
                    &draft.file_name,
                    &draft.file_size,
                    &now,
                ],
            )
            .await?;

        client
            .execute(
                "UPDATE conversations SET last_activity = $2 WHERE id = $1",
                &[&draft.chat_id, &now],
            )
            .await?;

        Message::from_row(&row)
    }

    /// Only the original sender may edit. Stamps `edited_at`.
    pub async fn edit_content(
        db: &Pool,
        message_id: Uuid,
        new_content: &str,
        actor_id: &str,
    ) -> AppResult<Message> {
        let client = db.get().await?;

        let row = client
            .query_opt("SELECT sender_id FROM messages WHERE id = $1", &[&message_id])
            .await?
            .ok_or(AppError::NotFound)?;
        let sender_id: String = row.get("sender_id");
        if sender_id != actor_id {
            return Err(AppError::Unauthorized);
        }

        let row = client
            .query_one(
                "UPDATE messages SET content = $2, edited_at = $3 WHERE id = $1 RETURNING *",
                &[&message_id, &new_content, &Utc::now()],
            )
            .await?;
        Message::from_row(&row)
    }

    /// Only the original sender may delete. Hard delete; a deleted message
    /// is never resurrected.
    pub async fn delete(db: &Pool, message_id: Uuid, actor_id: &str) -> AppResult<()> {
        let client = db.get().await?;

        let row = client
            .query_opt("SELECT sender_id FROM messages WHERE id = $1", &[&message_id])
            .await?
            .ok_or(AppError::NotFound)?;
        let sender_id: String = row.get("sender_id");
        if sender_id != actor_id {
            return Err(AppError::Unauthorized);
        }

        client
            .execute("DELETE FROM messages WHERE id = $1", &[&message_id])
            .await?;
        Ok(())
    }

    /// Replace the actor's reaction entry. The reactions object is keyed by
    /// participant id, so the single `jsonb_set` is atomic per participant:
    /// concurrent reactors never clobber each other, and a double-click from
    /// the same participant resolves last-write-wins.
    pub async fn react(
        db: &Pool,
        message_id: Uuid,
        actor_id: &str,
        actor_name: Option<&str>,
        emoji: &str,
    ) -> AppResult<Message> {
        if emoji.is_empty() {
            return Err(AppError::InvalidArgument("emoji must not be empty".into()));
        }

        let reaction = Reaction {
            emoji: emoji.to_string(),
            user_id: actor_id.to_string(),
            user_name: actor_name.map(|n| n.to_string()),
            reacted_at: Utc::now(),
        };
        let reaction_json = serde_json::to_value(&reaction)
            .map_err(|e| AppError::Database(format!("serialize reaction: {e}")))?;

        let client = db.get().await?;
        let row = client
            .query_opt(
                "UPDATE messages
                 SET reactions = jsonb_set(reactions, ARRAY[$2::text], $3)
                 WHERE id = $1
                 RETURNING *",
                &[&message_id, &actor_id, &reaction_json],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        Message::from_row(&row)
    }

    /// Flip the pin flag. Deliberately permissive: any participant of the
    /// conversation may pin or unpin.
    pub async fn toggle_pin(db: &Pool, message_id: Uuid) -> AppResult<Message> {
        let client = db.get().await?;
        let row = client
            .query_opt(
                "UPDATE messages SET pinned = NOT pinned WHERE id = $1 RETURNING *",
                &[&message_id],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        Message::from_row(&row)
    }

    /// Advance status to `read` iff the actor is the declared receiver.
    /// An authorization mismatch is a silent no-op (`Ok(None)`), not an
    /// error: read receipts are best-effort and must not fail the caller.
    /// Returns the updated message only when the status actually changed.
    pub async fn mark_read(
        db: &Pool,
        message_id: Uuid,
        actor_id: &str,
    ) -> AppResult<Option<Message>> {
        let client = db.get().await?;

        client
            .query_opt("SELECT 1 FROM messages WHERE id = $1", &[&message_id])
            .await?
            .ok_or(AppError::NotFound)?;

        let row = client
            .query_opt(
                "UPDATE messages
                 SET status = 'read'
                 WHERE id = $1 AND receiver_id = $2 AND status <> 'read'
                 RETURNING *",
                &[&message_id, &actor_id],
            )
            .await?;

        match row {
            Some(row) => Ok(Some(Message::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// History for one conversation, newest first. Two racing appends may
    /// tie on timestamp (order then arbitrary but stable); a later message
    /// never sorts before an earlier one.
    pub async fn page(db: &Pool, chat_id: &str, page: i64, size: i64) -> AppResult<HistoryPage> {
        let size = validate_page(page, size)?;
        let client = db.get().await?;

        let total: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM messages WHERE chat_id = $1",
                &[&chat_id],
            )
            .await?
            .get(0);

        let offset = page * size;
        let rows = client
            .query(
                "SELECT * FROM messages
                 WHERE chat_id = $1
                 ORDER BY created_at DESC, id
                 LIMIT $2 OFFSET $3",
                &[&chat_id, &size, &offset],
            )
            .await?;

        let messages = rows
            .iter()
            .map(Message::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage {
            messages,
            has_more: offset + size < total,
            total,
        })
    }

    /// Case-insensitive substring search over message content, optionally
    /// scoped to one conversation. Same pagination contract as `page`.
    pub async fn search(
        db: &Pool,
        query: &str,
        chat_id: Option<&str>,
        page: i64,
        size: i64,
    ) -> AppResult<HistoryPage> {
        if query.is_empty() {
            return Err(AppError::InvalidArgument("query must not be empty".into()));
        }
        let size = validate_page(page, size)?;
        let pattern = like_pattern(query);
        let client = db.get().await?;

        let (total, rows) = match chat_id {
            Some(chat_id) => {
                let total: i64 = client
                    .query_one(
                        "SELECT COUNT(*) FROM messages WHERE chat_id = $1 AND content ILIKE $2",
                        &[&chat_id, &pattern],
                    )
                    .await?
                    .get(0);
                let rows = client
                    .query(
                        "SELECT * FROM messages
                         WHERE chat_id = $1 AND content ILIKE $2
                         ORDER BY created_at DESC, id
                         LIMIT $3 OFFSET $4",
                        &[&chat_id, &pattern, &size, &(page * size)],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total: i64 = client
                    .query_one(
                        "SELECT COUNT(*) FROM messages WHERE content ILIKE $1",
                        &[&pattern],
                    )
                    .await?
                    .get(0);
                let rows = client
                    .query(
                        "SELECT * FROM messages
                         WHERE content ILIKE $1
                         ORDER BY created_at DESC, id
                         LIMIT $2 OFFSET $3",
                        &[&pattern, &size, &(page * size)],
                    )
                    .await?;
                (total, rows)
            }
        };

        let messages = rows
            .iter()
            .map(Message::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage {
            messages,
            has_more: page * size + size < total,
            total,
        })
    }
}

fn validate_page(page: i64, size: i64) -> AppResult<i64> {
    if page < 0 {
        return Err(AppError::InvalidArgument("page must be >= 0".into()));
    }
    if size <= 0 {
        return Err(AppError::InvalidArgument("size must be > 0".into()));
    }
    Ok(size.min(MAX_PAGE_SIZE))
}

/// Build an ILIKE pattern matching the query as a literal substring.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
