use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    /// Base URL prepended to object keys in returned file descriptors.
    /// Defaults to the virtual-hosted S3 URL for the bucket/region.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub presence_ttl_secs: u64,
    pub s3: S3Config,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.len() < 32 {
            return Err(crate::error::AppError::Config(
                "JWT_SECRET must be at least 32 bytes".into(),
            ));
        }

        let presence_ttl_secs = env::var("PRESENCE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let bucket = env::var("S3_BUCKET").unwrap_or_else(|_| "chat-media".into());
        let region = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let endpoint = env::var("S3_ENDPOINT").ok();
        let public_base_url = env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{bucket}.s3.{region}.amazonaws.com"));

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            presence_ttl_secs,
            s3: S3Config {
                bucket,
                region,
                endpoint,
                public_base_url,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // env vars are process-global, so everything lives in one test
    #[test]
    fn from_env_applies_defaults() {
        env::set_var("DATABASE_URL", "postgres://localhost/chat_test");
        env::set_var("JWT_SECRET", "test-secret-test-secret-test-secret!");
        env::remove_var("PORT");
        env::remove_var("S3_BUCKET");
        env::remove_var("S3_REGION");
        env::remove_var("S3_PUBLIC_BASE_URL");
        env::remove_var("PRESENCE_TTL_SECS");

        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.presence_ttl_secs, 60);
        assert_eq!(cfg.s3.bucket, "chat-media");
        assert_eq!(
            cfg.s3.public_base_url,
            "https://chat-media.s3.us-east-1.amazonaws.com"
        );

        env::set_var("JWT_SECRET", "too-short");
        assert!(Config::from_env().is_err());

        env::remove_var("DATABASE_URL");
        env::remove_var("JWT_SECRET");
    }
}
