//! S3-compatible object storage (AWS or MinIO through a custom endpoint).

use super::{check_object_name, object_name_for, ObjectStorage, UrlOptions};
use crate::error::StorageError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// Custom endpoint such as `http://localhost:9000`. Path-style addressing is used when set.
    pub endpoint: Option<String>,
    pub bucket: String,
    /// Base for non-presigned URLs. Falls back to the endpoint.
    pub public_url: Option<String>,
}

pub struct S3ObjectStorage {
    client: Client,
    settings: S3Settings,
}

impl S3ObjectStorage {
    /// Build a client from the ambient AWS configuration and make sure the bucket exists.
    pub async fn connect(settings: S3Settings) -> Result<Self, StorageError> {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let storage = S3ObjectStorage {
            client: Client::from_conf(builder.build()),
            settings,
        };
        storage.ensure_bucket().await?;
        Ok(storage)
    }

    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let bucket = &self.settings.bucket;
        if self.client.head_bucket().bucket(bucket).send().await.is_ok() {
            return Ok(());
        }
        tracing::info!(bucket = %bucket, "creating bucket");
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("create bucket {}: {}", bucket, e)))?;
        Ok(())
    }

    fn public_base(&self) -> String {
        let base = self
            .settings
            .public_url
            .as_deref()
            .or(self.settings.endpoint.as_deref())
            .unwrap_or("https://s3.amazonaws.com");
        format!("{}/{}", base.trim_end_matches('/'), self.settings.bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn store(&self, data: Vec<u8>, filename: &str, content_type: Option<&str>) -> Result<String, StorageError> {
        let name = object_name_for(filename);
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(&name)
            .body(ByteStream::from(data))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("put {}: {}", name, e)))?;
        tracing::debug!(object = %name, size, "stored object");
        Ok(name)
    }

    async fn retrieve(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        check_object_name(name)?;
        let out = self
            .client
            .get_object()
            .bucket(&self.settings.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => StorageError::NotFound(name.to_string()),
                _ => StorageError::Backend(format!("get {}: {}", name, e)),
            })?;
        let bytes = out
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("read {}: {}", name, e)))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn url_for(&self, name: &str, options: UrlOptions) -> Result<String, StorageError> {
        check_object_name(name)?;
        self.client
            .head_object()
            .bucket(&self.settings.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_not_found() => StorageError::NotFound(name.to_string()),
                _ => StorageError::Backend(format!("head {}: {}", name, e)),
            })?;
        if !options.presigned {
            return Ok(format!("{}/{}", self.public_base(), name));
        }
        let config = PresigningConfig::expires_in(options.expiry).map_err(|e| StorageError::Presign(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.settings.bucket)
            .key(name)
            .presigned(config)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
