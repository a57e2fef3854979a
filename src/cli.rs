//! Command-line surface of the `glasomat` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::cleaning::CleaningConfig;
use crate::db::Database;
use crate::{ingest, runner, settings};

#[derive(Parser, Debug)]
#[command(name = "glasomat", about = "Clean container location readings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Load a JSON export of raw readings into the store.
    Import { db: PathBuf, readings: PathBuf },
    /// Clean every stored location and record the run.
    Clean {
        db: PathBuf,
        /// Cleaning configuration; built-in defaults when omitted.
        config: Option<PathBuf>,
    },
    /// Write all cleaned readings to a JSON file.
    Export { db: PathBuf, out: PathBuf },
    /// Write the default configuration to a file.
    InitConfig { path: PathBuf },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import { db, readings } => {
            let database = Database::new(db)?;
            let rows = ingest::read_rows(&readings)?;
            let total = rows.len();
            let outcome = ingest::import_rows(rows);
            let stored = database.insert_readings(&outcome.readings).await?;
            log::info!(
                "imported {stored} of {total} rows into {} ({} dropped, {} locations rejected)",
                database.path().display(),
                outcome.dropped,
                outcome.failures.len()
            );
        }
        Command::Clean { db, config } => {
            // Load the config before opening the store so a bad path fails fast.
            let config = match config {
                Some(path) => settings::load_config(&path)?,
                None => CleaningConfig::default(),
            };
            let database = Database::new(db)?;
            let run = runner::run_cleaning(&database, &config).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Command::Export { db, out } => {
            let database = Database::new(db)?;
            let cleaned = database.get_all_cleaned_readings().await?;
            ingest::write_cleaned(&out, &cleaned)?;
            log::info!("exported {} cleaned readings to {}", cleaned.len(), out.display());
        }
        Command::InitConfig { path } => {
            settings::save_config(&path, &CleaningConfig::default())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_config_is_optional() {
        let cli = Cli::try_parse_from(["glasomat", "clean", "store.db"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Clean {
                db: "store.db".into(),
                config: None
            }
        );

        let cli = Cli::try_parse_from(["glasomat", "clean", "store.db", "cleaning.json"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Clean {
                db: "store.db".into(),
                config: Some("cleaning.json".into())
            }
        );
    }

    #[test]
    fn test_init_config_uses_kebab_case() {
        let cli = Cli::try_parse_from(["glasomat", "init-config", "cleaning.json"]).unwrap();
        assert_eq!(
            cli.command,
            Command::InitConfig {
                path: "cleaning.json".into()
            }
        );
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["glasomat", "clean", "store.db", "--strict"]).is_err());
        assert!(Cli::try_parse_from(["glasomat", "export", "store.db"]).is_err());
        assert!(Cli::try_parse_from(["glasomat", "reindex", "store.db"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_config_file_fails_clean() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.db");
        let config = dir.path().join("cleaning.jsn");

        let cli = Cli::try_parse_from([
            "glasomat".into(),
            "clean".into(),
            db.clone().into_os_string(),
            config.into_os_string(),
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn test_init_config_then_clean_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.db");
        let config = dir.path().join("cleaning.json");

        run(Cli {
            command: Command::InitConfig {
                path: config.clone(),
            },
        })
        .await
        .unwrap();
        assert_eq!(settings::load_config(&config).unwrap(), CleaningConfig::default());

        run(Cli {
            command: Command::Clean {
                db: db.clone(),
                config: Some(config),
            },
        })
        .await
        .unwrap();
        assert!(db.exists());
    }
}
