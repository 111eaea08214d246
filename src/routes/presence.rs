use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, middleware::AuthenticatedUser, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct PresenceResponse {
    pub user_id: String,
    pub online: bool,
}

/// GET /presence/{participant_id}
#[get("/presence/{participant_id}")]
pub async fn get_presence(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    participant_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let participant_id = participant_id.into_inner();
    let online = state.presence.is_online(&participant_id).await?;
    Ok(HttpResponse::Ok().json(PresenceResponse {
        user_id: participant_id,
        online,
    }))
}
