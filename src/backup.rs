//! Backup management for exported ledger documents.

use crate::error::{ErrorType, IntoResult, Re, Result};
use crate::model::BackupDocument;
use crate::{utils, Config};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;

/// Prefix for backups written by `accountant export` when no output path is given.
pub const EXPORT: &str = "accountant-backup";

/// Prefix for snapshots of the ledger taken immediately before an import.
pub const PRE_IMPORT: &str = "pre-import";

const JSON: &str = "json";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Saves a `BackupDocument` as a pretty-printed JSON backup file.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old backups, keeping only `backup_copies` files per prefix.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json(&self, prefix: &str, doc: &BackupDocument) -> Result<PathBuf> {
        self.save(prefix, doc).await.pub_result(ErrorType::Io)
    }

    /// Lists the backup files with `prefix`, oldest first.
    pub async fn list(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let files = self.matching(prefix).await.pub_result(ErrorType::Io)?;
        Ok(files.into_iter().map(|(path, _)| path).collect())
    }

    async fn save(&self, prefix: &str, doc: &BackupDocument) -> Re<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}.{JSON}"));

        let json = doc.to_json().context("Failed to serialize the backup document")?;
        utils::write(&path, json).await?;

        self.rotate(prefix).await?;

        Ok(path)
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Re<u32> {
        let max_seq = self
            .matching(prefix)
            .await?
            .iter()
            .filter_map(|(_, name)| parse_sequence_number(name, prefix, date))
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    /// Deletes the oldest backup files with `prefix` until only `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Re<()> {
        let files = self.matching(prefix).await?;
        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }
        Ok(())
    }

    /// Backup files with `prefix`, sorted by filename, which is date then sequence order.
    async fn matching(&self, prefix: &str) -> Re<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = utils::file_name(&entry.path());
            if is_backup_file(&name, prefix) {
                files.push((entry.path(), name));
            }
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a backup filename of the form `{prefix}.{date}-{NNN}.json`.
/// Returns None if the filename doesn't match.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{JSON}"))?
        .parse()
        .ok()
}

/// Checks if a filename is a JSON backup file with the given prefix.
fn is_backup_file(filename: &str, prefix: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(&format!(".{JSON}"))
}
