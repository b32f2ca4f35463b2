//! S3-compatible object storage for lesson videos and course thumbnails.

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Builder as S3ConfigBuilder, Client as S3Client};
use rand::Rng;
use std::path::Path;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload to bucket '{bucket}' failed: {message}")]
    Upload { bucket: String, message: String },
}

#[derive(Clone)]
pub struct Storage {
    client: S3Client,
    endpoint: String,
    pub video_bucket: String,
    pub thumbnail_bucket: String,
    public_base_url: Option<String>,
}

impl Storage {
    /// Build a client for an S3-compatible endpoint (MinIO, R2, garage...)
    /// with static credentials and path-style addressing.
    pub async fn connect(config: &StorageConfig) -> Self {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();

        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(&endpoint)
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
            endpoint,
            video_bucket: config.video_bucket.clone(),
            thumbnail_bucket: config.thumbnail_bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .cache_control("max-age=3600")
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Public URL for a stored object. The configured base may template
    /// {bucket}/{key}; otherwise the endpoint-path-style URL is used.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => build_public_url(base, bucket, key),
            None => format!("{}/{}/{}", self.endpoint, bucket, key),
        }
    }
}

fn build_public_url(base: &str, bucket: &str, key: &str) -> String {
    let trimmed = base.trim_end_matches('/');

    if trimmed.contains("{bucket}") || trimmed.contains("{key}") {
        return trimmed.replace("{bucket}", bucket).replace("{key}", key);
    }

    // If the base already names the bucket, append only the key.
    if trimmed.contains(bucket) {
        format!("{}/{}", trimmed, key)
    } else {
        format!("{}/{}/{}", trimmed, bucket, key)
    }
}

/// Randomized object key: `{prefix}/{millis}-{hex}.{ext}`, extension taken
/// from the uploaded filename.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit('.')
        .next()
        .filter(|e| !e.is_empty() && e.len() <= 8 && *e != file_name)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());

    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: [u8; 6] = rand::rng().random();

    format!("{}/{}-{}.{}", prefix, millis, hex::encode(nonce), ext)
}
