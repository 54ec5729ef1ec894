// One full backup cycle: dump, pack, upload, prune

use crate::archive;
use crate::cadence::Cadence;
use crate::config::BackupConfig;
use crate::dump::DumpProducer;
use crate::errors::{BackupError, DumpError};
use crate::retention;
use crate::storage::{artifact_filename, cadence_prefix, object_key, BackupStore};
use crate::telemetry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Outcome of a successful backup cycle
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Object key the archive was uploaded under
    pub key: String,
    /// Archives removed by the retention pass
    pub pruned: usize,
}

/// Runs full backup cycles against one database and one store
pub struct BackupRunner {
    store: Arc<dyn BackupStore>,
    dumper: Arc<dyn DumpProducer>,
    subfolder: String,
    filename_prefix: String,
    retention_count: u32,
    object_lock: bool,
}

impl BackupRunner {
    pub fn new(
        store: Arc<dyn BackupStore>,
        dumper: Arc<dyn DumpProducer>,
        backup: &BackupConfig,
    ) -> Self {
        Self {
            store,
            dumper,
            subfolder: backup.subfolder.clone(),
            filename_prefix: backup.filename_prefix.clone(),
            retention_count: backup.retention_count,
            object_lock: backup.object_lock,
        }
    }

    /// Run one cycle for a cadence and record its metrics
    #[instrument(skip(self), fields(cadence = %cadence))]
    pub async fn run(&self, cadence: Cadence) -> Result<CycleOutcome, BackupError> {
        let started = Instant::now();
        let result = self.run_cycle(cadence).await;
        let duration = started.elapsed().as_secs_f64();

        telemetry::record_backup_duration(cadence, duration);
        match &result {
            Ok(outcome) => {
                telemetry::record_backup_success(cadence);
                info!(
                    cadence = %cadence,
                    key = %outcome.key,
                    pruned = outcome.pruned,
                    duration_seconds = duration,
                    "Backup cycle completed"
                );
            }
            Err(_) => telemetry::record_backup_failure(cadence),
        }
        result
    }

    async fn run_cycle(&self, cadence: Cadence) -> Result<CycleOutcome, BackupError> {
        let workspace = tempfile::tempdir().map_err(DumpError::from)?;
        let artifact_name = artifact_filename(&self.filename_prefix, Utc::now());

        let artifact = self
            .dumper
            .produce(workspace.path(), &artifact_name)
            .await?;

        // Object-lock buckets require the upload to carry a payload digest
        let content_md5 = if self.object_lock {
            let digest_path = artifact.clone();
            let digest =
                tokio::task::spawn_blocking(move || archive::file_md5_base64(&digest_path))
                    .await
                    .map_err(|e| DumpError::Io(format!("digest task failed: {}", e)))?
                    .map_err(DumpError::from)?;
            Some(digest)
        } else {
            None
        };

        let key = object_key(&self.subfolder, cadence, &artifact_name);
        self.store
            .put(&key, &artifact, content_md5.as_deref())
            .await?;

        // The upload is durable from here on: neither a failed local cleanup
        // nor a failed retention pass fails the cycle
        if let Err(e) = workspace.close() {
            warn!(error = %e, "Failed to remove local workspace");
        }

        let prefix = cadence_prefix(&self.subfolder, cadence);
        let pruned =
            match retention::prune(self.store.as_ref(), &prefix, self.retention_count as usize)
                .await
            {
                Ok(outcome) => {
                    telemetry::record_retention_deleted(cadence, outcome.deleted as u64);
                    outcome.deleted
                }
                Err(e) => {
                    warn!(cadence = %cadence, error = %e, "Retention pruning skipped");
                    0
                }
            };

        Ok(CycleOutcome { key, pruned })
    }
}
