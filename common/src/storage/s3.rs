// S3-compatible object store client built on rust-s3

use crate::config::StorageConfig;
use crate::errors::StoreError;
use crate::storage::{BackupStore, RemoteObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Store client wrapper around a single bucket
#[derive(Clone, Debug)]
pub struct S3Store {
    bucket: Arc<Bucket>,
}

impl S3Store {
    /// Create a new store client from configuration
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket))]
    pub async fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        info!("Initializing object store client");

        // Create credentials
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| {
            error!(error = %e, "Failed to create storage credentials");
            StoreError::Unavailable(format!("Failed to create credentials: {}", e))
        })?;

        // Custom region carries the endpoint, scheme included, so plain-http
        // MinIO endpoints keep working
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials).map_err(|e| {
            error!(error = %e, "Failed to create bucket handle");
            StoreError::Unavailable(format!("Failed to create bucket handle: {}", e))
        })?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            path_style = config.path_style,
            "Object store client initialized"
        );

        Ok(Self {
            bucket: Arc::new(bucket),
        })
    }

    // Object-lock enabled buckets refuse writes without a Content-MD5 header.
    fn bucket_with_content_md5(&self, digest: &str) -> Result<Bucket, String> {
        let value = HeaderValue::from_str(digest)
            .map_err(|e| format!("invalid Content-MD5 value: {}", e))?;
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("content-md5"), value);
        (*self.bucket)
            .clone()
            .with_extra_headers(headers)
            .map_err(|e| format!("failed to attach Content-MD5 header: {}", e))
    }
}

#[async_trait]
impl BackupStore for S3Store {
    /// List all objects under a prefix, flattening continuation pages
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        debug!(prefix = %prefix, "Listing archives");

        // No delimiter: the listing recurses into the whole prefix
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(|e| {
                error!(error = %e, prefix = %prefix, "Failed to list archives");
                StoreError::Unavailable(format!(
                    "Failed to list objects with prefix '{}': {}",
                    prefix, e
                ))
            })?;

        let mut objects = Vec::new();
        for page in pages {
            for item in page.contents {
                match DateTime::parse_from_rfc3339(&item.last_modified) {
                    Ok(ts) => objects.push(RemoteObject {
                        key: item.key,
                        last_modified: ts.with_timezone(&Utc),
                        size: item.size,
                    }),
                    Err(e) => {
                        warn!(
                            key = %item.key,
                            error = %e,
                            "Skipping object with unparseable last_modified"
                        );
                    }
                }
            }
        }

        debug!(prefix = %prefix, count = objects.len(), "Archives listed");
        Ok(objects)
    }

    /// Upload a local archive, buffering it only when a Content-MD5 digest
    /// has to be computed over the exact payload
    #[instrument(skip(self, source, content_md5), fields(key = %key))]
    async fn put(
        &self,
        key: &str,
        source: &Path,
        content_md5: Option<&str>,
    ) -> Result<(), StoreError> {
        debug!(key = %key, source = %source.display(), "Uploading archive");

        match content_md5 {
            Some(digest) => {
                let data = tokio::fs::read(source).await.map_err(|e| {
                    error!(error = %e, key = %key, "Failed to read archive for upload");
                    StoreError::UploadFailed {
                        key: key.to_string(),
                        reason: format!("failed to read archive: {}", e),
                    }
                })?;
                let bucket = self.bucket_with_content_md5(digest).map_err(|reason| {
                    error!(reason = %reason, key = %key, "Failed to prepare upload");
                    StoreError::UploadFailed {
                        key: key.to_string(),
                        reason,
                    }
                })?;
                bucket.put_object(key, &data).await.map_err(|e| {
                    error!(error = %e, key = %key, "Failed to upload archive");
                    StoreError::UploadFailed {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })?;
            }
            None => {
                let mut file = tokio::fs::File::open(source).await.map_err(|e| {
                    error!(error = %e, key = %key, "Failed to open archive for upload");
                    StoreError::UploadFailed {
                        key: key.to_string(),
                        reason: format!("failed to open archive: {}", e),
                    }
                })?;
                self.bucket
                    .put_object_stream(&mut file, key)
                    .await
                    .map_err(|e| {
                        error!(error = %e, key = %key, "Failed to upload archive");
                        StoreError::UploadFailed {
                            key: key.to_string(),
                            reason: e.to_string(),
                        }
                    })?;
            }
        }

        debug!(key = %key, "Archive uploaded");
        Ok(())
    }

    /// Download an object into a local file
    #[instrument(skip(self, dest), fields(key = %key))]
    async fn get(&self, key: &str, dest: &Path) -> Result<(), StoreError> {
        debug!(key = %key, dest = %dest.display(), "Downloading archive");

        let response = self.bucket.get_object(key).await.map_err(|e| {
            error!(error = %e, key = %key, "Failed to download archive");
            StoreError::DownloadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        if response.status_code() != 200 {
            error!(key = %key, status = response.status_code(), "Unexpected download status");
            return Err(StoreError::DownloadFailed {
                key: key.to_string(),
                reason: format!("unexpected status {}", response.status_code()),
            });
        }

        tokio::fs::write(dest, response.bytes()).await.map_err(|e| {
            error!(error = %e, key = %key, "Failed to write downloaded archive");
            StoreError::DownloadFailed {
                key: key.to_string(),
                reason: format!("failed to write local file: {}", e),
            }
        })?;

        debug!(key = %key, size = response.bytes().len(), "Archive downloaded");
        Ok(())
    }

    /// Delete a single object
    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        debug!(key = %key, "Deleting archive");

        self.bucket.delete_object(key).await.map_err(|e| {
            error!(error = %e, key = %key, "Failed to delete archive");
            StoreError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(key = %key, "Archive deleted");
        Ok(())
    }

    /// Health check for the object store connection
    ///
    /// A shallow listing of the prefix is enough to verify both reachability
    /// and list permission, which is what the agent actually depends on.
    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn healthcheck(&self, prefix: &str) -> Result<(), StoreError> {
        debug!(prefix = %prefix, "Performing object store health check");

        match self
            .bucket
            .list(format!("{}/", prefix), Some("/".to_string()))
            .await
        {
            Ok(_) => {
                debug!("Object store health check passed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Object store health check failed");
                Err(StoreError::Unavailable(format!(
                    "Health check failed: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "test-bucket".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: true,
        }
    }

    #[tokio::test]
    async fn test_store_creation() {
        let config = test_config();
        let result = S3Store::new(&config).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_content_md5_bucket_construction() {
        let store = S3Store::new(&test_config()).await.unwrap();
        assert!(store
            .bucket_with_content_md5("1B2M2Y8AsgTpgAmY7PhCfg==")
            .is_ok());
        // Header values cannot contain control characters
        assert!(store.bucket_with_content_md5("bad\nvalue").is_err());
    }
}
