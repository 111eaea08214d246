//! Conversation Store: direct-chat and group records, membership, and the
//! authorization policy for mutating them.

use chrono::Utc;
use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{direct_chat_id, Chat, ChatKind};

pub struct ChatService;

impl ChatService {
    /// Create-or-get the direct conversation for an unordered participant
    /// pair. Both sides of a concurrent first contact derive the same id, so
    /// the insert is an idempotent upsert: whoever loses the race simply
    /// reads the winner's row. No lock, no retry loop.
    pub async fn create_or_get_direct(db: &Pool, p1: &str, p2: &str) -> AppResult<Chat> {
        let id = direct_chat_id(p1, p2)?;
        let client = db.get().await?;

        let now = Utc::now();
        let participants = vec![p1.to_string(), p2.to_string()];
        client
            .execute(
                "INSERT INTO conversations (id, kind, participants, created_at, last_activity)
                 VALUES ($1, 'direct', $2, $3, $3)
                 ON CONFLICT (id) DO NOTHING",
                &[&id, &participants, &now],
            )
            .await?;

        let row = client
            .query_one("SELECT * FROM conversations WHERE id = $1", &[&id])
            .await?;
        Chat::from_row(&row)
    }

    /// All conversations (direct and group) a participant belongs to,
    /// most recently active first.
    pub async fn list_for_participant(db: &Pool, participant_id: &str) -> AppResult<Vec<Chat>> {
        let client = db.get().await?;
        let rows = client
            .query(
                "SELECT * FROM conversations
                 WHERE $1 = ANY(participants)
                 ORDER BY last_activity DESC",
                &[&participant_id],
            )
            .await?;
        rows.iter().map(Chat::from_row).collect()
    }

    pub async fn get(db: &Pool, chat_id: &str) -> AppResult<Chat> {
        let client = db.get().await?;
        let row = client
            .query_opt("SELECT * FROM conversations WHERE id = $1", &[&chat_id])
            .await?
            .ok_or(AppError::NotFound)?;
        Chat::from_row(&row)
    }

    /// Create a group. The creator becomes the immutable owner and is always
    /// a member, whether or not they listed themselves.
    pub async fn create_group(
        db: &Pool,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        avatar_url: Option<&str>,
        initial_members: &[String],
    ) -> AppResult<Chat> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidArgument("group name is required".into()));
        }
        if name.len() > 255 {
            return Err(AppError::InvalidArgument(
                "group name too long (max 255)".into(),
            ));
        }

        let mut participants = vec![owner_id.to_string()];
        for member in initial_members {
            if !participants.contains(member) {
                participants.push(member.clone());
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let client = db.get().await?;
        let row = client
            .query_one(
                "INSERT INTO conversations
                     (id, kind, participants, name, description, avatar_url, owner_id, created_at, last_activity)
                 VALUES ($1, 'group', $2, $3, $4, $5, $6, $7, $7)
                 RETURNING *",
                &[
                    &id,
                    &participants,
                    &name,
                    &description,
                    &avatar_url,
                    &owner_id,
                    &now,
                ],
            )
            .await?;
        Chat::from_row(&row)
    }

    /// Adding a member requires the actor to be the owner or an existing
    /// member. Idempotent: adding a present member changes nothing.
    pub async fn add_member(
        db: &Pool,
        group_id: &str,
        member_id: &str,
        actor_id: &str,
    ) -> AppResult<Chat> {
        let chat = Self::get_group(db, group_id).await?;
        let is_owner = chat.owner_id.as_deref() == Some(actor_id);
        if !is_owner && !chat.is_participant(actor_id) {
            return Err(AppError::Unauthorized);
        }

        let client = db.get().await?;
        client
            .execute(
                "UPDATE conversations
                 SET participants = array_append(participants, $2)
                 WHERE id = $1 AND NOT ($2 = ANY(participants))",
                &[&group_id, &member_id],
            )
            .await?;
        Self::get(db, group_id).await
    }

    /// Removing a member requires the actor to be the owner, or the member
    /// removing themself.
    pub async fn remove_member(
        db: &Pool,
        group_id: &str,
        member_id: &str,
        actor_id: &str,
    ) -> AppResult<Chat> {
        let chat = Self::get_group(db, group_id).await?;
        let is_owner = chat.owner_id.as_deref() == Some(actor_id);
        if !is_owner && member_id != actor_id {
            return Err(AppError::Unauthorized);
        }

        let client = db.get().await?;
        client
            .execute(
                "UPDATE conversations
                 SET participants = array_remove(participants, $2)
                 WHERE id = $1",
                &[&group_id, &member_id],
            )
            .await?;
        Self::get(db, group_id).await
    }

    /// Metadata updates are owner-only. Only supplied fields change.
    pub async fn update_metadata(
        db: &Pool,
        group_id: &str,
        actor_id: &str,
        name: Option<&str>,
        description: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AppResult<Chat> {
        let chat = Self::get_group(db, group_id).await?;
        if chat.owner_id.as_deref() != Some(actor_id) {
            return Err(AppError::Unauthorized);
        }
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(AppError::InvalidArgument("group name is required".into()));
            }
        }

        let client = db.get().await?;
        let row = client
            .query_one(
                "UPDATE conversations
                 SET name = COALESCE($2, name),
                     description = COALESCE($3, description),
                     avatar_url = COALESCE($4, avatar_url)
                 WHERE id = $1
                 RETURNING *",
                &[&group_id, &name, &description, &avatar_url],
            )
            .await?;
        Chat::from_row(&row)
    }

    /// Deletion is owner-only. The group's message history is left in place.
    pub async fn delete_group(db: &Pool, group_id: &str, actor_id: &str) -> AppResult<()> {
        let chat = Self::get_group(db, group_id).await?;
        if chat.owner_id.as_deref() != Some(actor_id) {
            return Err(AppError::Unauthorized);
        }

        let client = db.get().await?;
        client
            .execute("DELETE FROM conversations WHERE id = $1", &[&group_id])
            .await?;
        Ok(())
    }

    async fn get_group(db: &Pool, group_id: &str) -> AppResult<Chat> {
        let chat = Self::get(db, group_id).await?;
        if chat.kind != ChatKind::Group {
            return Err(AppError::InvalidArgument(
                "conversation is not a group".into(),
            ));
        }
        Ok(chat)
    }
}
