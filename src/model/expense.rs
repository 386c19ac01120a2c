use crate::error::{Error, Re};
use crate::model::record::{decode_error, Record, Value};
use crate::model::supplier::non_blank;
use crate::model::{parse_date, Amount, Collection, Id, Supplier, UNCATEGORISED, UNKNOWN_SUPPLIER};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;

/// A dated expense, optionally linked to a supplier and an invoice file.
///
/// `supplier_id` and `invoice_file_id` are plain identifiers. They are not guaranteed to resolve:
/// the referenced supplier may have been removed from a restored backup, or a file insert may
/// never have completed. Look them up through the `Ledger` resolve functions, which report a
/// missing target as `None`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// ISO `YYYY-MM-DD`, so string order is date order.
    pub date: String,
    #[serde(default)]
    pub supplier_id: Option<Id>,
    /// The supplier's name when the expense was created. Not updated if the supplier is renamed.
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invoice_file_id: Option<Id>,
}

impl Expense {
    /// The supplier name snapshot, or "Unknown" when there is none.
    pub fn supplier_label(&self) -> &str {
        match self.supplier_name.trim() {
            "" => UNKNOWN_SUPPLIER,
            name => name,
        }
    }

    /// The sub-category used for grouping, with blank values mapped to "Uncategorised".
    pub fn sub_category_label(&self) -> &str {
        match self.sub_category.as_deref() {
            None | Some("") => UNCATEGORISED,
            Some(s) => s,
        }
    }
}

/// The fields a caller supplies to create an expense. The supplier name snapshot and the invoice
/// reference are filled in by the ledger.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFields {
    pub date: String,
    pub supplier_id: Option<Id>,
    pub category: String,
    pub sub_category: Option<String>,
    pub amount: Option<Amount>,
    pub description: Option<String>,
}

impl ExpenseFields {
    pub fn new(date: impl Into<String>, category: impl Into<String>, amount: Amount) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            amount: Some(amount),
            ..Default::default()
        }
    }

    pub fn supplier(mut self, supplier_id: Id) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn sub_category(mut self, sub_category: impl Into<String>) -> Self {
        self.sub_category = Some(sub_category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fills an empty category and sub-category from the supplier's defaults.
    pub fn prefill_from(&mut self, supplier: &Supplier) {
        if self.category.trim().is_empty() {
            if let Some(default) = &supplier.default_category {
                self.category = default.clone();
            }
        }
        if non_blank(self.sub_category.clone()).is_none() {
            if let Some(default) = &supplier.default_sub_category {
                self.sub_category = Some(default.clone());
            }
        }
    }

    pub(crate) fn validate(self) -> Result<Expense, Error> {
        let date = self.date.trim();
        if date.is_empty() {
            return Err(Error::validation("An expense date is required"));
        }
        parse_date(date).map_err(Error::validation)?;
        let amount = self
            .amount
            .ok_or_else(|| Error::validation("An expense amount is required"))?;
        let category = self.category.trim();
        if category.is_empty() {
            return Err(Error::validation("An expense category is required"));
        }
        Ok(Expense {
            id: None,
            date: date.to_string(),
            supplier_id: self.supplier_id,
            supplier_name: String::new(),
            category: category.to_string(),
            sub_category: non_blank(self.sub_category),
            amount,
            description: non_blank(self.description),
            invoice_file_id: None,
        })
    }
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;
    const COLUMNS: &'static [&'static str] = &[
        "date",
        "supplier_id",
        "supplier_name",
        "category",
        "sub_category",
        "amount",
        "description",
        "invoice_file_id",
    ];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn values(&self) -> Re<Vec<Value>> {
        Ok(vec![
            self.date.clone().into(),
            self.supplier_id.into(),
            self.supplier_name.clone().into(),
            self.category.clone().into(),
            self.sub_category.clone().into(),
            // Stored as decimal text so that no precision is lost in the store.
            self.amount.value().to_string().into(),
            self.description.clone().into(),
            self.invoice_file_id.into(),
        ])
    }
}

impl<'r> FromRow<'r, SqliteRow> for Expense {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let amount: String = row.try_get("amount")?;
        let amount = Amount::from_str(&amount).map_err(|e| decode_error("amount", e))?;
        Ok(Self {
            id: Some(row.try_get("id")?),
            date: row.try_get("date")?,
            supplier_id: row.try_get("supplier_id")?,
            supplier_name: row.try_get("supplier_name")?,
            category: row.try_get("category")?,
            sub_category: row.try_get("sub_category")?,
            amount,
            description: row.try_get("description")?,
            invoice_file_id: row.try_get("invoice_file_id")?,
        })
    }
}
