use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;
use crate::middleware::auth::verify_jwt;

/// Authenticated participant extracted from the bearer token. Handlers that
/// take this extractor cannot be reached without a verified identity.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        Box::pin(async move {
            let token = token.ok_or(AppError::Unauthorized)?;
            let claims = verify_jwt(&token)?;
            Ok(AuthenticatedUser {
                id: claims.sub,
                name: claims.name,
            })
        })
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}
