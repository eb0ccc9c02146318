use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::config::StorageConfig;
use crate::storage::{DOWNLOAD_URL_TTL, ObjectStorage, StorageError, UPLOAD_URL_TTL};

/// S3 (or S3-compatible) bucket access. Signed URLs are never cached.
pub struct S3Storage {
    client: Client,
    bucket: Option<String>,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "model-gallery-config",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        let bucket = config.bucket_name().map(str::to_string);
        if bucket.is_none() {
            log::warn!("No storage bucket configured, storage requests will fail");
        }

        Self {
            client: Client::from_conf(s3_config),
            bucket,
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    fn bucket(&self) -> Result<&str, StorageError> {
        self.bucket
            .as_deref()
            .ok_or(StorageError::BucketNotConfigured)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let bucket = self.bucket()?;
        let size = body.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Put {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        log::debug!("Stored object {key} ({size} bytes) in {bucket}");
        Ok(())
    }

    async fn generate_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let bucket = self.bucket()?;
        let presign_error = |message: String| StorageError::Presign {
            method: "PUT",
            key: key.to_string(),
            message,
        };

        let presigning =
            PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| presign_error(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| presign_error(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn generate_download_url(&self, key: &str) -> Result<String, StorageError> {
        let bucket = self.bucket()?;
        let presign_error = |message: String| StorageError::Presign {
            method: "GET",
            key: key.to_string(),
            message,
        };

        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_TTL)
            .map_err(|e| presign_error(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| presign_error(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        let bucket = self.bucket.as_deref().unwrap_or_default();
        match &self.endpoint {
            Some(endpoint) => format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/')),
            None => format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region),
        }
    }
}
