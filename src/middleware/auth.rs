//! JWT validation. Token issuance belongs to the authentication collaborator;
//! this service only verifies and extracts the sender identity every request
//! must carry.

use jsonwebtoken::{decode, DecodingKey, Validation};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

static DECODING_KEY: OnceCell<DecodingKey> = OnceCell::new();

/// Verified sender identity, as supplied by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// participant id
    pub sub: String,
    /// display name, used for typing indicators and reactions
    #[serde(default)]
    pub name: String,
    pub exp: i64,
}

/// Install the HS256 validation key. Call once at startup, before the server
/// accepts requests.
pub fn init_jwt(secret: &str) -> Result<(), AppError> {
    DECODING_KEY
        .set(DecodingKey::from_secret(secret.as_bytes()))
        .map_err(|_| AppError::StartServer("JWT validation key already initialized".into()))
}

pub fn verify_jwt(token: &str) -> Result<Claims, AppError> {
    let key = DECODING_KEY
        .get()
        .ok_or_else(|| AppError::StartServer("JWT validation key not initialized".into()))?;

    let data = decode::<Claims>(token, key, &Validation::default())
        .map_err(|_| AppError::Unauthorized)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn token(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_roundtrips_claims() {
        let _ = init_jwt(SECRET);
        let claims = Claims {
            sub: "u1".into(),
            name: "User One".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let verified = verify_jwt(&token(&claims)).unwrap();
        assert_eq!(verified.sub, "u1");
        assert_eq!(verified.name, "User One");
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let _ = init_jwt(SECRET);
        let claims = Claims {
            sub: "u1".into(),
            name: String::new(),
            exp: chrono::Utc::now().timestamp() - 3600,
        };
        assert!(matches!(
            verify_jwt(&token(&claims)),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let _ = init_jwt(SECRET);
        assert!(matches!(
            verify_jwt("not.a.token"),
            Err(AppError::Unauthorized)
        ));
    }
}
