// Error taxonomy for the backup pipeline

use thiserror::Error;

/// Dump production errors
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("pg_dump exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Dump artifact is invalid: {0}")]
    Invalid(String),

    #[error("Local I/O failed: {0}")]
    Io(String),
}

/// Object store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error("Upload failed for '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    #[error("Download failed for '{key}': {reason}")]
    DownloadFailed { key: String, reason: String },

    #[error("Delete failed for '{key}': {reason}")]
    DeleteFailed { key: String, reason: String },
}

/// Archive packing and validation errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive I/O failed: {0}")]
    Io(String),

    #[error("Archive is not a readable gzip/tar stream: {0}")]
    Corrupt(String),

    #[error("Archive contains no entries")]
    Empty,
}

/// Restore pipeline errors
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Fetching archive failed: {0}")]
    Fetch(String),

    #[error("Downloaded archive is invalid: {0}")]
    Invalid(String),

    #[error("Unpacking archive failed: {0}")]
    Unpack(String),

    #[error("pg_restore exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Local I/O failed: {0}")]
    Io(String),
}

/// Cycle-level error carried by the scheduler
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Dump step failed: {0}")]
    Dump(#[from] DumpError),

    #[error("Store step failed: {0}")]
    Store(#[from] StoreError),
}

impl From<std::io::Error> for DumpError {
    fn from(err: std::io::Error) -> Self {
        DumpError::Io(err.to_string())
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(err.to_string())
    }
}

impl From<std::io::Error> for RestoreError {
    fn from(err: std::io::Error) -> Self {
        RestoreError::Io(err.to_string())
    }
}

impl From<ArchiveError> for DumpError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Io(reason) => DumpError::Io(reason),
            other => DumpError::Invalid(other.to_string()),
        }
    }
}

impl From<ArchiveError> for RestoreError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Io(reason) => RestoreError::Io(reason),
            other => RestoreError::Invalid(other.to_string()),
        }
    }
}
