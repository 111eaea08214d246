//! Group management endpoints. Metadata updates and deletion are owner-only;
//! member addition requires owner or existing member; member removal
//! requires owner or removing oneself.

use actix_web::{delete, post, put, web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppError, middleware::AuthenticatedUser, services::ChatService, state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub member_id: String,
}

/// POST /groups
#[post("/groups")]
pub async fn create_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, AppError> {
    let chat = ChatService::create_group(
        &state.db,
        &user.id,
        &body.name,
        body.description.as_deref(),
        body.avatar_url.as_deref(),
        &body.members,
    )
    .await?;
    Ok(HttpResponse::Created().json(chat))
}

/// PUT /groups/{id}, owner only.
#[put("/groups/{id}")]
pub async fn update_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    group_id: web::Path<String>,
    body: web::Json<UpdateGroupRequest>,
) -> Result<HttpResponse, AppError> {
    let chat = ChatService::update_metadata(
        &state.db,
        &group_id,
        &user.id,
        body.name.as_deref(),
        body.description.as_deref(),
        body.avatar_url.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(chat))
}

/// POST /groups/{id}/members, caller must be owner or existing member.
#[post("/groups/{id}/members")]
pub async fn add_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    group_id: web::Path<String>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, AppError> {
    let chat = ChatService::add_member(&state.db, &group_id, &body.member_id, &user.id).await?;
    Ok(HttpResponse::Ok().json(chat))
}

/// DELETE /groups/{id}/members/{member_id}, owner or self-removal.
#[delete("/groups/{id}/members/{member_id}")]
pub async fn remove_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (group_id, member_id) = path.into_inner();
    let chat = ChatService::remove_member(&state.db, &group_id, &member_id, &user.id).await?;
    Ok(HttpResponse::Ok().json(chat))
}

/// DELETE /groups/{id}, owner only.
#[delete("/groups/{id}")]
pub async fn delete_group(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    group_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    ChatService::delete_group(&state.db, &group_id, &user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}
