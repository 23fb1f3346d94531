/// S3-backed object store
///
/// Reads source uploads and writes derived renditions. Works against AWS S3
/// or any S3-compatible endpoint (MinIO, LocalStack) via `S3_ENDPOINT`.
use super::{ObjectStore, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

/// Object store backed by the AWS S3 SDK
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build an S3 client from the shared SDK config plus storage overrides
    pub fn from_config(sdk_config: &SdkConfig, config: &StorageConfig) -> Self {
        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(config.force_path_style);

        // Custom endpoint for S3-compatible storage like MinIO
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            path_style = config.force_path_style,
            "S3 client initialized"
        );

        Self::new(Client::from_conf(builder.build()))
    }

    /// Verify the bucket is reachable with the configured credentials
    pub async fn health_check(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        debug!(bucket = %bucket, key = %key, "Downloading from S3");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Request(DisplayErrorContext(&e).to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Body(e.to_string()))?
            .into_bytes();

        debug!(bucket = %bucket, key = %key, size = bytes.len(), "Downloaded from S3");
        Ok(bytes)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                if message.contains("NoSuchBucket") {
                    StorageError::Request(format!("S3 bucket not found: {bucket}"))
                } else {
                    StorageError::Request(message)
                }
            })?;

        debug!(bucket = %bucket, key = %key, size, "Uploaded to S3");
        Ok(())
    }
}
