//! Menu image storage on S3. Uploaded objects are public-read behind the
//! configured base URL.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;

use crate::config::Config;

#[derive(Clone)]
pub struct ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl ImageStore {
    /// Build the S3 client from config. Returns `None` when no bucket is
    /// configured.
    pub async fn from_config(config: &Config) -> Option<Self> {
        let bucket = config.images_bucket.clone()?;
        let public_base_url = config
            .images_public_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));

        let sdk_config = aws_config::load_from_env().await;
        Some(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket,
            public_base_url,
        })
    }

    /// Upload an image and return its public URL.
    pub async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control("max-age=3600")
            .send()
            .await
            .context("Failed to upload image")?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}
