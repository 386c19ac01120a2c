//! Backup commands: `export` and `import`.

use crate::backup::{EXPORT, PRE_IMPORT};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::BackupDocument;
use crate::{utils, Config, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Exports the whole ledger to `out`, or to a new rotated file in the backups directory, and
/// returns the path written.
pub async fn export(config: Config, out: Option<&Path>) -> Result<Out<PathBuf>> {
    let doc = config.ledger().export_all().await?;
    let path = match out {
        Some(path) => {
            utils::write(path, doc.to_json()?)
                .await
                .pub_result(ErrorType::Io)?;
            path.to_path_buf()
        }
        None => config.backup().save_json(EXPORT, &doc).await?,
    };
    Ok(Out::new(
        format!(
            "Exported {} supplier(s), {} expense(s) and {} file(s) to {}",
            doc.suppliers.len(),
            doc.expenses.len(),
            doc.files.len(),
            path.display()
        ),
        path,
    ))
}

/// Restores the backup document at `path`.
///
/// The document is parsed and checked before anything else happens. The current ledger is then
/// saved to the backups directory, and only then is the document written to the ledger.
///
/// # Errors
/// - `Io` if the document or the snapshot cannot be read or written.
/// - `Validation` if the document is malformed or fails the restore checks.
/// - `Storage` if the restore fails, in which case the ledger is unchanged.
pub async fn import(config: Config, path: &Path) -> Result<Out<usize>> {
    let json = utils::read(path).await.pub_result(ErrorType::Io)?;
    let doc = BackupDocument::from_json(&json)?;
    doc.check()?;

    let ledger = config.ledger();
    let snapshot = ledger.export_all().await?;
    let snapshot_path = config.backup().save_json(PRE_IMPORT, &snapshot).await?;
    info!("Saved the current ledger to {}", snapshot_path.display());

    ledger.import_all(&doc).await?;
    let count = doc.record_count();
    Ok(Out::new(
        format!(
            "Imported {} supplier(s), {} file(s) and {} expense(s) from {}",
            doc.suppliers.len(),
            doc.files.len(),
            doc.expenses.len(),
            path.display()
        ),
        count,
    ))
}
