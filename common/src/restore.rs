// Listing stored archives and restoring one through pg_restore

use crate::archive;
use crate::cadence::Cadence;
use crate::errors::{RestoreError, StoreError};
use crate::storage::{cadence_prefix, BackupStore, RemoteObject};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

/// List archives for one cadence, or for all of them, newest first
pub async fn list_archives(
    store: &dyn BackupStore,
    subfolder: &str,
    cadence: Option<Cadence>,
) -> Result<Vec<RemoteObject>, StoreError> {
    let cadences: Vec<Cadence> = match cadence {
        Some(c) => vec![c],
        None => Cadence::ALL.to_vec(),
    };

    let mut objects = Vec::new();
    for c in cadences {
        objects.extend(store.list(&cadence_prefix(subfolder, c)).await?);
    }
    objects.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(objects)
}

/// Download, validate, unpack and pg_restore an archive into the target
/// database.
///
/// The restore runs with --clean --if-exists, so objects already present in
/// the target are dropped and recreated from the archive.
#[instrument(skip(store, database_url), fields(key = %key))]
pub async fn restore_archive(
    store: &dyn BackupStore,
    key: &str,
    database_url: &str,
    jobs: u32,
) -> Result<(), RestoreError> {
    let workspace = tempfile::tempdir().map_err(RestoreError::from)?;
    let archive_path = workspace.path().join("archive.tar.gz");

    info!(key = %key, "Fetching archive");
    store
        .get(key, &archive_path)
        .await
        .map_err(|e| RestoreError::Fetch(e.to_string()))?;

    let dump_dir = workspace.path().join("dump");
    let validate_src = archive_path.clone();
    let unpack_dest = dump_dir.clone();
    tokio::task::spawn_blocking(move || -> Result<(), RestoreError> {
        archive::validate(&validate_src)?;
        archive::unpack(&validate_src, &unpack_dest)
            .map_err(|e| RestoreError::Unpack(e.to_string()))?;
        Ok(())
    })
    .await
    .map_err(|e| RestoreError::Io(format!("unpack task failed: {}", e)))??;

    debug!(dump_dir = %dump_dir.display(), jobs = jobs, "Running pg_restore");
    let output = Command::new("pg_restore")
        .args(restore_args(database_url, jobs, &dump_dir))
        .output()
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to spawn pg_restore");
            RestoreError::Io(format!("failed to spawn pg_restore: {}", e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(status = %output.status, stderr = %stderr, "pg_restore failed");
        return Err(RestoreError::Failed {
            status: output.status.to_string(),
            stderr,
        });
    }

    info!(key = %key, "Archive restored");
    Ok(())
}

fn restore_args(database_url: &str, jobs: u32, dump_dir: &Path) -> Vec<String> {
    vec![
        "--format=directory".to_string(),
        format!("--jobs={}", jobs),
        "--clean".to_string(),
        "--if-exists".to_string(),
        format!("--dbname={}", database_url),
        dump_dir.display().to_string(),
    ]
}
