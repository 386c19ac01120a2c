//! Conversion of supplier and invoice spreadsheets (CSV) into a `BackupDocument` that can be
//! restored with `Ledger::import_all`.
//!
//! Column headers are matched loosely: case and any non-alphanumeric characters are ignored, so
//! `Supplier Name`, `supplier_name` and `SUPPLIER-NAME` are the same column. Each field accepts a
//! list of aliases and the first alias with a non-empty value wins.

use crate::error::{ErrorType, IntoResult, Re, Result};
use crate::model::{Amount, BackupDocument, Expense, Id, Supplier, UNCATEGORISED};
use anyhow::Context;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

const SUPPLIER_NAME: &[&str] = &["name", "supplier", "supplier_name", "vendor", "company"];
const SUPPLIER_ADDRESS: &[&str] = &["address", "supplier_address"];
const SUPPLIER_PHONE: &[&str] = &["phone", "supplier_phone", "mobile"];
const SUPPLIER_CATEGORY: &[&str] = &["default_category", "category"];
const SUPPLIER_SUB_CATEGORY: &[&str] = &["default_sub_category", "subcategory", "sub_category"];

const INVOICE_SUPPLIER: &[&str] = &["supplier", "supplier_name", "vendor", "name", "company"];
const INVOICE_DATE: &[&str] = &["date", "invoice_date", "transaction_date"];
const INVOICE_AMOUNT: &[&str] = &["amount", "total", "invoice_total", "value"];
const INVOICE_CATEGORY: &[&str] = &["category", "expense_category"];
const INVOICE_SUB_CATEGORY: &[&str] = &["subcategory", "sub_category", "expense_subcategory"];
const INVOICE_DESCRIPTION: &[&str] = &["description", "memo", "notes", "item"];

/// Builds a restorable document from the text of a suppliers CSV and an invoices CSV.
///
/// - Suppliers are deduplicated by case-insensitive name and keyed `1..n` in order of first
///   appearance. A supplier named only in the invoices file is created with no other details.
/// - Each invoice row becomes an expense keyed `1..n`. A missing category becomes
///   `Uncategorised`, and an amount that cannot be read becomes zero.
/// - No files are produced.
///
/// A CSV that cannot be parsed is a `Validation` error.
pub fn csv_to_document(suppliers_csv: &str, invoices_csv: &str) -> Result<BackupDocument> {
    let supplier_rows = read_rows(suppliers_csv)
        .context("Unable to read the suppliers CSV")
        .pub_result(ErrorType::Validation)?;
    let invoice_rows = read_rows(invoices_csv)
        .context("Unable to read the invoices CSV")
        .pub_result(ErrorType::Validation)?;

    let mut suppliers = Suppliers::default();
    for row in &supplier_rows {
        suppliers.ensure(&row.pick(SUPPLIER_NAME), Some(row));
    }

    let mut expenses = Vec::with_capacity(invoice_rows.len());
    for row in &invoice_rows {
        let supplier_name = row.pick(INVOICE_SUPPLIER);
        let supplier_id = suppliers.ensure(&supplier_name, None);
        let category = row.pick(INVOICE_CATEGORY);
        expenses.push(Expense {
            id: Some(expenses.len() as Id + 1),
            date: row.pick(INVOICE_DATE),
            supplier_id,
            supplier_name,
            category: if category.is_empty() {
                UNCATEGORISED.to_string()
            } else {
                category
            },
            sub_category: row.pick_opt(INVOICE_SUB_CATEGORY),
            amount: parse_amount(&row.pick(INVOICE_AMOUNT)),
            description: row.pick_opt(INVOICE_DESCRIPTION),
            invoice_file_id: None,
        });
    }

    debug!(
        "Converted {} suppliers and {} expenses",
        suppliers.list.len(),
        expenses.len()
    );
    Ok(BackupDocument {
        suppliers: suppliers.list,
        expenses,
        files: Vec::new(),
    })
}

#[derive(Default)]
struct Suppliers {
    list: Vec<Supplier>,
    by_name: HashMap<String, Id>,
}

impl Suppliers {
    /// Returns the key of the supplier called `name`, creating it from `row` if it is new.
    /// A blank name has no supplier.
    fn ensure(&mut self, name: &str, row: Option<&Row>) -> Option<Id> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let key = name.to_lowercase();
        if let Some(id) = self.by_name.get(&key) {
            return Some(*id);
        }

        let id = self.list.len() as Id + 1;
        let pick = |aliases: &[&str]| row.and_then(|r| r.pick_opt(aliases));
        self.list.push(Supplier {
            id: Some(id),
            name: name.to_string(),
            address: pick(SUPPLIER_ADDRESS),
            phone: pick(SUPPLIER_PHONE),
            default_category: pick(SUPPLIER_CATEGORY),
            default_sub_category: pick(SUPPLIER_SUB_CATEGORY),
        });
        self.by_name.insert(key, id);
        Some(id)
    }
}

/// One CSV row keyed by normalized header.
struct Row(HashMap<String, String>);

impl Row {
    /// The first non-empty value among `aliases`, or an empty string.
    fn pick(&self, aliases: &[&str]) -> String {
        self.pick_opt(aliases).unwrap_or_default()
    }

    fn pick_opt(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| self.0.get(&normalize(alias)))
            .find(|value| !value.is_empty())
            .cloned()
    }
}

fn read_rows(text: &str) -> Re<Vec<Row>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .context("Unable to read the header row")?
        .iter()
        .map(normalize)
        .collect();

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Unable to read row {}", index + 1))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect();
        rows.push(Row(row));
    }
    Ok(rows)
}

/// Lowercases `s` and drops everything but letters and digits.
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn parse_amount(raw: &str) -> Amount {
    Amount::from_str(raw).unwrap_or(Amount::ZERO)
}
