//! S3-compatible storage client.
//!
//! Supabase Storage exposes an S3 API, so the client is a plain
//! `aws-sdk-s3` client pointed at the project's storage endpoint with
//! path-style addressing.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::paths::validate_key;

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint of the storage service
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket holding raw uploads
    pub uploads_bucket: String,
    /// Bucket holding rendered outputs
    pub outputs_bucket: String,
    /// Region (ignored by Supabase Storage but required by the SDK)
    pub region: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            uploads_bucket: std::env::var("STORAGE_UPLOADS_BUCKET")
                .unwrap_or_else(|_| "videos".to_string()),
            outputs_bucket: std::env::var("STORAGE_OUTPUTS_BUCKET")
                .unwrap_or_else(|_| "processed-videos".to_string()),
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// Blob store client for raw uploads and rendered outputs.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    uploads_bucket: String,
    outputs_bucket: String,
}

impl StorageClient {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            uploads_bucket: config.uploads_bucket,
            outputs_bucket: config.outputs_bucket,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    /// Upload bytes into the raw-uploads bucket.
    pub async fn upload_input(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        self.put(&self.uploads_bucket, data, key, content_type).await
    }

    /// Upload bytes into the rendered-outputs bucket.
    pub async fn upload_output(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        self.put(&self.outputs_bucket, data, key, content_type).await
    }

    async fn put(
        &self,
        bucket: &str,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Uploading {} bytes to {}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {}/{}", bucket, key);
        Ok(())
    }

    /// Download a raw upload as bytes.
    pub async fn download_input(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.get(&self.uploads_bucket, key).await
    }

    /// Download a rendered output as bytes.
    pub async fn download_output(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.get(&self.outputs_bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        debug!("Downloading {}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Presigned GET URL for a raw upload, so the render worker can pull
    /// the source without holding storage credentials.
    pub async fn presign_input(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.presign(&self.uploads_bucket, key, expires_in).await
    }

    /// Presigned GET URL for a rendered output.
    pub async fn presign_output(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.presign(&self.outputs_bucket, key, expires_in).await
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(key)?;

        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Check whether a raw upload exists.
    pub async fn input_exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.uploads_bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Sdk(e.to_string()))
                }
            }
        }
    }

    /// Delete every object a job owns under the given prefix in both buckets.
    pub async fn delete_job_objects(&self, prefix: &str) -> StorageResult<u32> {
        validate_key(prefix)?;
        let mut deleted = 0;
        for bucket in [&self.uploads_bucket, &self.outputs_bucket] {
            deleted += self.delete_prefix(bucket, prefix).await?;
        }
        Ok(deleted)
    }

    async fn delete_prefix(&self, bucket: &str, prefix: &str) -> StorageResult<u32> {
        let listed = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| StorageError::Sdk(e.to_string()))?;

        let keys: Vec<String> = listed
            .contents()
            .iter()
            .filter_map(|o| o.key().map(String::from))
            .collect();

        if keys.is_empty() {
            return Ok(0);
        }

        let objects: Vec<_> = keys
            .iter()
            .filter_map(|k| {
                aws_sdk_s3::types::ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .ok()
            })
            .collect();

        let delete = aws_sdk_s3::types::Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        info!("Deleted {} objects under {}/{}", keys.len(), bucket, prefix);
        Ok(keys.len() as u32)
    }

    /// Connectivity probe for the readiness endpoint.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.uploads_bucket)
            .send()
            .await
            .map_err(|e| StorageError::Sdk(format!("storage connectivity check failed: {e}")))?;
        Ok(())
    }
}
