// Object storage abstraction and bucket key layout for backup archives

pub mod s3;

pub use s3::S3Store;

use crate::cadence::Cadence;
use crate::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// A stored archive as reported by the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Object store operations the backup pipeline needs
///
/// The production implementation is [`S3Store`]; tests substitute mocks.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// List every object under the given key prefix
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError>;

    /// Upload a local file to the given key, optionally with a Content-MD5 header
    async fn put(
        &self,
        key: &str,
        source: &Path,
        content_md5: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Download an object into a local file
    async fn get(&self, key: &str, dest: &Path) -> Result<(), StoreError>;

    /// Delete a single object
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Verify the store is reachable and the prefix is listable
    async fn healthcheck(&self, prefix: &str) -> Result<(), StoreError>;
}

/// Generate the key prefix of a cadence folder
/// Format: {subfolder}/{cadence}/
pub fn cadence_prefix(subfolder: &str, cadence: Cadence) -> String {
    format!("{}/{}/", subfolder, cadence.prefix_segment())
}

/// Generate the full object key for an archive
/// Format: {subfolder}/{cadence}/{filename}
pub fn object_key(subfolder: &str, cadence: Cadence, filename: &str) -> String {
    format!("{}/{}/{}", subfolder, cadence.prefix_segment(), filename)
}

/// Generate an archive file name from the configured prefix and a timestamp
/// Format: {prefix}-{timestamp}.tar.gz, with ':' and '.' in the timestamp
/// replaced by '-' so the name stays portable across filesystems
pub fn artifact_filename(filename_prefix: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(':', "-")
        .replace('.', "-");
    format!("{}-{}.tar.gz", filename_prefix, stamp)
}
