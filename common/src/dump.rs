// pg_dump invocation and archive production

use crate::archive;
use crate::config::{BackupConfig, DatabaseConfig};
use crate::errors::DumpError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

/// Produces a validated archive inside a workspace directory
///
/// The production implementation shells out to pg_dump; tests substitute
/// implementations that write a file directly.
#[async_trait]
pub trait DumpProducer: Send + Sync {
    /// Dump the database and pack it into `{workspace}/{artifact_name}`,
    /// returning the path of the validated archive
    async fn produce(&self, workspace: &Path, artifact_name: &str) -> Result<PathBuf, DumpError>;
}

/// pg_dump based producer using the parallel directory format
pub struct PgDumpProducer {
    database_url: String,
    jobs: u32,
    extra_args: Vec<String>,
}

impl PgDumpProducer {
    pub fn new(database: &DatabaseConfig, backup: &BackupConfig) -> Self {
        Self {
            database_url: database.url.clone(),
            jobs: backup.jobs,
            extra_args: backup.extra_dump_args.clone(),
        }
    }

    // Configured extra arguments go between the fixed flags and the
    // connection argument, matching pg_dump's options-before-dbname grammar.
    fn dump_args(&self, dump_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "--format=directory".to_string(),
            format!("--jobs={}", self.jobs),
            format!("--file={}", dump_dir.display()),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(format!("--dbname={}", self.database_url));
        args
    }
}

#[async_trait]
impl DumpProducer for PgDumpProducer {
    #[instrument(skip(self, workspace), fields(artifact = %artifact_name))]
    async fn produce(&self, workspace: &Path, artifact_name: &str) -> Result<PathBuf, DumpError> {
        let dump_dir = workspace.join("dump");

        debug!(dump_dir = %dump_dir.display(), jobs = self.jobs, "Running pg_dump");
        let output = Command::new("pg_dump")
            .args(self.dump_args(&dump_dir))
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to spawn pg_dump");
                DumpError::Io(format!("failed to spawn pg_dump: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = %output.status, stderr = %stderr, "pg_dump failed");
            return Err(DumpError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let artifact = workspace.join(artifact_name);
        let pack_src = dump_dir.clone();
        let pack_dest = artifact.clone();
        tokio::task::spawn_blocking(move || {
            archive::pack_dir(&pack_src, &pack_dest)?;
            archive::validate(&pack_dest)
        })
        .await
        .map_err(|e| DumpError::Io(format!("archive task failed: {}", e)))??;

        info!(artifact = %artifact.display(), "Dump archive produced and validated");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer_with(jobs: u32, extra: &[&str]) -> PgDumpProducer {
        let database = DatabaseConfig {
            url: "postgresql://localhost/app".to_string(),
        };
        let backup = BackupConfig {
            jobs,
            extra_dump_args: extra.iter().map(|s| s.to_string()).collect(),
            ..BackupConfig::default()
        };
        PgDumpProducer::new(&database, &backup)
    }

    #[test]
    fn test_dump_args_use_directory_format_and_jobs() {
        let producer = producer_with(4, &[]);
        let args = producer.dump_args(Path::new("/tmp/work/dump"));
        assert_eq!(
            args,
            vec![
                "--format=directory",
                "--jobs=4",
                "--file=/tmp/work/dump",
                "--dbname=postgresql://localhost/app",
            ]
        );
    }

    #[test]
    fn test_dump_args_append_extra_arguments_before_dbname() {
        let producer = producer_with(1, &["--exclude-table=audit_log", "--no-owner"]);
        let args = producer.dump_args(Path::new("/w/dump"));
        let extra_pos = args.iter().position(|a| a == "--no-owner").unwrap();
        let dbname_pos = args
            .iter()
            .position(|a| a.starts_with("--dbname="))
            .unwrap();
        assert!(args.iter().any(|a| a == "--exclude-table=audit_log"));
        assert!(extra_pos < dbname_pos);
        assert_eq!(dbname_pos, args.len() - 1);
    }

    #[tokio::test]
    #[ignore] // Requires pg_dump on PATH and a reachable database
    async fn test_produce_creates_validated_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let producer = producer_with(1, &[]);
        let artifact = producer
            .produce(tmp.path(), "backup-test.tar.gz")
            .await
            .unwrap();
        assert!(artifact.exists());
        archive::validate(&artifact).unwrap();
    }
}
