use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::AuthenticatedUser,
    models::Message,
    routing::router::read_receipt,
    services::{HistoryPage, MessageDraft, MessageService},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub chat_id: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

fn default_page_size() -> i64 {
    50
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub total: i64,
}

impl From<HistoryPage> for HistoryResponse {
    fn from(page: HistoryPage) -> Self {
        HistoryResponse {
            messages: page.messages,
            has_more: page.has_more,
            total: page.total,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReactRequest {
    pub emoji: String,
}

#[derive(Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub message_id: Uuid,
    /// true when the status actually transitioned to `read`
    pub read: bool,
}

/// POST /messages
/// Persist a message, then fan it out. The stored record is returned and is
/// the source of truth (it carries the generated id and timestamp); a failed
/// publish never fails the request, since the durable write already happened.
#[post("/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<MessageDraft>,
) -> Result<HttpResponse, AppError> {
    let message = MessageService::append(&state.db, &body, &user.id).await?;
    state.router.route_message(&message).await;
    Ok(HttpResponse::Ok().json(message))
}

/// GET /messages?chat_id=..&page=..&size=..
/// History newest-first; bypasses the router entirely.
#[get("/messages")]
pub async fn get_messages(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let page = MessageService::page(&state.db, &query.chat_id, query.page, query.size).await?;
    Ok(HttpResponse::Ok().json(HistoryResponse::from(page)))
}

/// GET /messages/search?q=..&chat_id=..
#[get("/messages/search")]
pub async fn search_messages(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let page = MessageService::search(
        &state.db,
        &query.q,
        query.chat_id.as_deref(),
        query.page,
        query.size,
    )
    .await?;
    Ok(HttpResponse::Ok().json(HistoryResponse::from(page)))
}

/// PUT /messages/{id}, sender only.
#[put("/messages/{id}")]
pub async fn edit_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
    body: web::Json<EditMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message =
        MessageService::edit_content(&state.db, message_id.into_inner(), &body.content, &user.id)
            .await?;
    Ok(HttpResponse::Ok().json(message))
}

/// DELETE /messages/{id}, sender only.
#[delete("/messages/{id}")]
pub async fn delete_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    MessageService::delete(&state.db, message_id.into_inner(), &user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /messages/{id}/react
/// Replaces the caller's previous reaction, if any.
#[post("/messages/{id}/react")]
pub async fn react_to_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
    body: web::Json<ReactRequest>,
) -> Result<HttpResponse, AppError> {
    let message = MessageService::react(
        &state.db,
        message_id.into_inner(),
        &user.id,
        Some(&user.name),
        &body.emoji,
    )
    .await?;
    Ok(HttpResponse::Ok().json(message))
}

/// POST /messages/{id}/pin, any participant may toggle.
#[post("/messages/{id}/pin")]
pub async fn toggle_pin(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message = MessageService::toggle_pin(&state.db, message_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}

/// POST /messages/{id}/read
/// Best-effort: a non-receiver gets a 200 with `read: false`, not an error.
/// A receipt is published only when the status actually transitioned.
#[post("/messages/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message_id = message_id.into_inner();
    let updated = MessageService::mark_read(&state.db, message_id, &user.id).await?;

    let read = updated.is_some();
    if read {
        state
            .router
            .route_read_receipt(&read_receipt(message_id, &user.id))
            .await;
    }

    Ok(HttpResponse::Ok().json(MarkReadResponse { message_id, read }))
}
