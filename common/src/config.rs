// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// S3-compatible object store that holds the backup archives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_path_style() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL handed to pg_dump and pg_restore via --dbname
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
    /// Top-level key prefix the cadence folders live under
    #[serde(default = "default_subfolder")]
    pub subfolder: String,
    /// Newest archives kept per cadence prefix when pruning
    #[serde(default = "default_retention_count")]
    pub retention_count: u32,
    /// Parallel jobs for pg_dump and pg_restore
    #[serde(default = "default_jobs")]
    pub jobs: u32,
    /// Send a Content-MD5 header with uploads, required by object-lock buckets
    #[serde(default)]
    pub object_lock: bool,
    /// Extra arguments appended verbatim to every pg_dump invocation
    #[serde(default)]
    pub extra_dump_args: Vec<String>,
}

fn default_filename_prefix() -> String {
    "backup".to_string()
}

fn default_subfolder() -> String {
    "db".to_string()
}

fn default_retention_count() -> u32 {
    5
}

fn default_jobs() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Run one evaluation pass immediately at startup before the timer loop
    #[serde(default)]
    pub run_on_startup: bool,
    /// Run one evaluation pass and exit instead of looping
    #[serde(default)]
    pub single_shot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus exporter port, 0 disables the exporter
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9464
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("PGVAULT")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        // Validate storage config
        if self.storage.endpoint.is_empty() {
            return Err("Storage endpoint cannot be empty".to_string());
        }
        if self.storage.region.is_empty() {
            return Err("Storage region cannot be empty".to_string());
        }
        if self.storage.bucket.is_empty() {
            return Err("Storage bucket cannot be empty".to_string());
        }

        // Validate database config
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }

        // Validate backup config
        if self.backup.filename_prefix.is_empty() {
            return Err("Backup filename_prefix cannot be empty".to_string());
        }
        if self.backup.subfolder.is_empty() {
            return Err("Backup subfolder cannot be empty".to_string());
        }
        if self.backup.subfolder.starts_with('/') || self.backup.subfolder.ends_with('/') {
            return Err("Backup subfolder must not start or end with '/'".to_string());
        }
        if self.backup.retention_count == 0 {
            return Err("Backup retention_count must be greater than 0".to_string());
        }
        if self.backup.jobs == 0 {
            return Err("Backup jobs must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                region: "us-east-1".to_string(),
                bucket: "pgvault".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                path_style: true,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/postgres".to_string(),
            },
            backup: BackupConfig::default(),
            agent: AgentConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            filename_prefix: default_filename_prefix(),
            subfolder: default_subfolder(),
            retention_count: default_retention_count(),
            jobs: default_jobs(),
            object_lock: false,
            extra_dump_args: Vec::new(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}
