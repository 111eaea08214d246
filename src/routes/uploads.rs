use actix_web::{http::header, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{error::AppError, middleware::AuthenticatedUser, state::AppState};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Deserialize, ToSchema)]
pub struct UploadQuery {
    pub file_name: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "uploads".to_string()
}

/// POST /uploads?file_name=..&folder=..
/// Stores the raw request body in object storage and returns the
/// `{url, name, size}` descriptor a file message carries.
#[post("/uploads")]
pub async fn upload_file(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    if query.file_name.is_empty() || query.file_name.len() > 255 {
        return Err(AppError::InvalidArgument("invalid file name".into()));
    }
    if body.is_empty() {
        return Err(AppError::InvalidArgument("empty upload".into()));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::InvalidArgument("upload too large".into()));
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let stored = state
        .media
        .upload(body, &query.folder, &query.file_name, &content_type)
        .await?;
    Ok(HttpResponse::Ok().json(stored))
}
