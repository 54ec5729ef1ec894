// backupctl: inspect stored backup archives and restore one into a database

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::cadence::Cadence;
use common::config::Settings;
use common::restore;
use common::storage::S3Store;

#[derive(Parser, Debug)]
#[command(version, about = "Inspect and restore pgvault backups", long_about = None)]
struct Cli {
    /// Directory holding default.toml / local.toml configuration
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored archives, newest first
    List {
        /// Only show one cadence (weekly, daily, hourly, 10min)
        #[arg(long)]
        cadence: Option<Cadence>,
    },
    /// Restore an archive into a database
    Restore {
        /// Object key of the archive, as shown by list
        key: String,
        /// Target database URL (defaults to database.url from configuration)
        #[arg(long)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings =
        Settings::load_from_path(&cli.config_dir).context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let store = S3Store::new(&settings.storage)
        .await
        .context("Failed to initialize object store")?;

    match cli.command {
        Command::List { cadence } => {
            let archives =
                restore::list_archives(&store, &settings.backup.subfolder, cadence).await?;
            if archives.is_empty() {
                println!("no archives found");
                return Ok(());
            }

            let key_width = archives.iter().map(|o| o.key.len()).max().unwrap_or(3);
            println!("{:<key_width$}  {:>10}  {}", "KEY", "SIZE", "LAST MODIFIED");
            for object in archives {
                println!(
                    "{:<key_width$}  {:>10}  {}",
                    object.key,
                    format_size(object.size),
                    object.last_modified.to_rfc3339()
                );
            }
        }
        Command::Restore { key, database_url } => {
            let target = database_url.unwrap_or_else(|| settings.database.url.clone());
            println!("restoring {key} ...");
            restore::restore_archive(&store, &key, &target, settings.backup.jobs).await?;
            println!("restored {key}");
        }
    }

    Ok(())
}

/// Human-readable size with binary units
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_cli_parses_list_with_cadence() {
        let cli = Cli::parse_from(["backupctl", "list", "--cadence", "hourly"]);
        match cli.command {
            Command::List { cadence } => assert_eq!(cadence, Some(Cadence::Hourly)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_cadence() {
        assert!(Cli::try_parse_from(["backupctl", "list", "--cadence", "monthly"]).is_err());
    }

    #[test]
    fn test_cli_parses_restore_with_database_url() {
        let cli = Cli::parse_from([
            "backupctl",
            "restore",
            "db/daily/backup-x.tar.gz",
            "--database-url",
            "postgresql://localhost/other",
        ]);
        match cli.command {
            Command::Restore { key, database_url } => {
                assert_eq!(key, "db/daily/backup-x.tar.gz");
                assert_eq!(
                    database_url.as_deref(),
                    Some("postgresql://localhost/other")
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
