use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidArgument(_) => 400,
            AppError::Unauthorized => 401,
            AppError::NotFound => 404,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal => 500,
            AppError::Transport(_) => 502,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        // 5xx detail stays in the logs, not the response body
        let message = if status.is_server_error() {
            self.error_code().to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(json!({
            "error": message,
            "code": self.error_code(),
        }))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Transport(e.to_string())
    }
}
