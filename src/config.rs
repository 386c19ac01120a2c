//! Configuration file handling.
//!
//! The configuration file is stored at `$ACCOUNTANT_HOME/config.json` and holds the settings for
//! backups and reporting. The home directory also holds the ledger store and the backups
//! directory.

use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Re, Result};
use crate::ledger::Ledger;
use crate::utils;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "accountant";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const FINANCIAL_YEAR_START_MONTH: u32 = 7;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const ACCOUNTANT_SQLITE: &str = "accountant.sqlite";

/// The `Config` object represents the configured home directory of the app. You instantiate it by
/// providing the path to `$ACCOUNTANT_HOME`, and from there it loads `config.json` and opens the
/// ledger store. It owns the single `Ledger` handle used for the rest of the session.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    ledger: Ledger,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the home directory and its subdirectories, writes an initial `config.json` with
    /// default settings, and creates the ledger store.
    ///
    /// # Errors
    /// - `Config` if a configuration already exists in `dir` or a file operation fails.
    /// - `Initialization` if the store cannot be created.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        let root = create_home(&maybe_relative)
            .await
            .pub_result(ErrorType::Config)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file
            .save(&config_path)
            .await
            .pub_result(ErrorType::Config)?;

        let sqlite_path = root.join(ACCOUNTANT_SQLITE);
        let ledger = Ledger::open(&sqlite_path).await?;

        Ok(Self {
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
            ledger,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the backups directory exists
    /// - open the ledger store
    pub async fn load(accountant_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = accountant_home.into();
        let (root, config_file) = load_home(&maybe_relative)
            .await
            .pub_result(ErrorType::Config)?;

        let sqlite_path = root.join(ACCOUNTANT_SQLITE);
        let ledger = Ledger::open(&sqlite_path).await?;

        Ok(Self {
            backups: root.join(BACKUPS),
            config_path: root.join(CONFIG_JSON),
            root,
            config_file,
            ledger,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// The month (1-12) on which the financial year starts.
    pub fn financial_year_start_month(&self) -> u32 {
        self.config_file.financial_year_start_month
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

async fn create_home(maybe_relative: &Path) -> Re<PathBuf> {
    utils::make_dir(maybe_relative)
        .await
        .context("Unable to create the accountant home directory")?;
    let root = utils::canonicalize(maybe_relative).await?;
    let config_path = root.join(CONFIG_JSON);
    if config_path.is_file() {
        bail!(
            "A configuration already exists at '{}'",
            config_path.display()
        );
    }
    utils::make_dir(root.join(BACKUPS)).await?;
    Ok(root)
}

async fn load_home(maybe_relative: &Path) -> Re<(PathBuf, ConfigFile)> {
    let root = utils::canonicalize(maybe_relative)
        .await
        .context("The accountant home directory is missing; run 'accountant init' first")?;

    let config_path = root.join(CONFIG_JSON);
    if !config_path.is_file() {
        bail!("The config file is missing '{}'", config_path.display())
    }
    let config_file = ConfigFile::load(&config_path).await?;

    let backups = root.join(BACKUPS);
    if !backups.is_dir() {
        bail!("The backups directory is missing '{}'", backups.display())
    }
    Ok((root, config_file))
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "accountant",
///   "config_version": 1,
///   "backup_copies": 5,
///   "financial_year_start_month": 7
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "accountant"
    app_name: String,

    config_version: u8,

    /// Number of backup copies of each kind to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// The month the default report range starts on. July gives a July-June financial year.
    #[serde(default = "default_financial_year_start_month")]
    financial_year_start_month: u32,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

fn default_financial_year_start_month() -> u32 {
    FINANCIAL_YEAR_START_MONTH
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            financial_year_start_month: FINANCIAL_YEAR_START_MONTH,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    async fn load(path: impl AsRef<Path>) -> Re<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            (1..=12).contains(&config.financial_year_start_month),
            "Invalid financial_year_start_month in config file: {}",
            config.financial_year_start_month
        );
        ensure!(
            config.backup_copies > 0,
            "Invalid backup_copies in config file: at least one copy must be kept"
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Re<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}
