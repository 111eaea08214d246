use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppError, middleware::AuthenticatedUser, models::Chat, services::ChatService,
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateDirectChatRequest {
    /// the other participant; the caller is taken from the bearer token
    pub participant_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatListResponse {
    pub chats: Vec<Chat>,
}

/// POST /chats/direct
/// Create-or-get the direct conversation with another participant.
/// Calling it twice (or racing another caller) returns the same record.
#[post("/chats/direct")]
pub async fn create_direct_chat(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateDirectChatRequest>,
) -> Result<HttpResponse, AppError> {
    let chat = ChatService::create_or_get_direct(&state.db, &user.id, &body.participant_id).await?;
    Ok(HttpResponse::Ok().json(chat))
}

/// GET /chats: every conversation the caller belongs to, recent first.
#[get("/chats")]
pub async fn list_chats(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let chats = ChatService::list_for_participant(&state.db, &user.id).await?;
    Ok(HttpResponse::Ok().json(ChatListResponse { chats }))
}
