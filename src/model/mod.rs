//! Types that represent the ledger's data model: `Supplier`, `Expense` and `FileAttachment`, the
//! collections they live in, and the `BackupDocument` that holds all three.
mod amount;
mod expense;
mod file;
pub(crate) mod record;
mod supplier;

use crate::error::{Error, ErrorType, IntoResult, Result};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use amount::{Amount, AmountError};
pub use expense::{Expense, ExpenseFields};
pub use file::{mime_type_for, FileAttachment, InvoiceUpload};
pub use supplier::{Supplier, SupplierFields};

/// Primary key of a record within its collection.
pub type Id = i64;

/// Sub-category label for expenses that have none.
pub const UNCATEGORISED: &str = "Uncategorised";

/// Display label for an expense with no supplier name.
pub const UNKNOWN_SUPPLIER: &str = "Unknown";

/// The three independently keyed collections of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Suppliers,
    Expenses,
    Files,
}

serde_plain::derive_display_from_serialize!(Collection);
serde_plain::derive_fromstr_from_deserialize!(Collection);

impl Collection {
    /// The SQLite table backing this collection.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Collection::Suppliers => "suppliers",
            Collection::Expenses => "expenses",
            Collection::Files => "files",
        }
    }
}

/// Parses a strict ISO `YYYY-MM-DD` date. Unpadded forms like `2024-7-1` are rejected because they
/// would break the string ordering that date filtering relies on.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("'{s}' is not a valid YYYY-MM-DD date"))?;
    if date.format("%Y-%m-%d").to_string() != s {
        bail!("'{s}' is not a valid YYYY-MM-DD date");
    }
    Ok(date)
}

/// A full snapshot of all three collections. This is the export and restore interchange format.
///
/// A document that is missing one of the arrays is read as if that array were empty.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

impl BackupDocument {
    /// Parses a document from JSON. A malformed document is a `Validation` error.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("The backup document is malformed")
            .pub_result(ErrorType::Validation)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .context("Unable to serialize the backup document")
            .pub_result(ErrorType::Validation)
    }

    /// Checks that every entry can be restored. Each entry must carry a key, checked in restore
    /// order, and each file size must fit the store's integer column.
    pub(crate) fn check(&self) -> Result<()> {
        let missing = first_missing(Collection::Suppliers, self.suppliers.iter().map(|s| s.id))
            .or_else(|| first_missing(Collection::Files, self.files.iter().map(|f| f.id)))
            .or_else(|| first_missing(Collection::Expenses, self.expenses.iter().map(|e| e.id)));
        if let Some((collection, index)) = missing {
            return Err(Error::validation(format!(
                "Entry {index} of '{collection}' has no id; restore requires an explicit key"
            )));
        }
        if let Some((index, file)) = self
            .files
            .iter()
            .enumerate()
            .find(|(_, f)| i64::try_from(f.size).is_err())
        {
            return Err(Error::validation(format!(
                "Entry {index} of 'files' has size {}, which is too large",
                file.size
            )));
        }
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.suppliers.len() + self.expenses.len() + self.files.len()
    }
}

fn first_missing(
    collection: Collection,
    ids: impl Iterator<Item = Option<Id>>,
) -> Option<(Collection, usize)> {
    ids.enumerate()
        .find(|(_, id)| id.is_none())
        .map(|(index, _)| (collection, index))
}
