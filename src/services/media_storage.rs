//! Pluggable object storage for uploaded media. The delivery core only ever
//! consumes the returned `{url, name, size}` descriptor; any provider that
//! can store bytes under a key satisfies the trait.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::S3Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
    pub name: String,
    pub size: i64,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        folder: &str,
        file_name: &str,
        content_type: &str,
    ) -> AppResult<StoredObject>;
}

pub struct S3MediaStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaStorage {
    pub async fn from_config(cfg: &S3Config) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint.as_str()).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: cfg.bucket.clone(),
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    async fn upload(
        &self,
        bytes: Bytes,
        folder: &str,
        file_name: &str,
        content_type: &str,
    ) -> AppResult<StoredObject> {
        let size = bytes.len() as i64;
        let key = object_key(folder, file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("s3 put_object: {e}")))?;

        Ok(StoredObject {
            url: format!("{}/{}", self.public_base_url, key),
            key,
            name: file_name.to_string(),
            size,
        })
    }
}

/// Object keys are unique per upload; the original file name is kept as a
/// sanitized suffix so downloads stay recognizable.
fn object_key(folder: &str, file_name: &str) -> String {
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}/{}-{}", folder.trim_matches('/'), Uuid::new_v4(), safe_name)
}
