//! The collaborator-facing API of the bookkeeping ledger.
//!
//! `Ledger` owns the store handle for the lifetime of a session. Everything a presentation layer
//! may do goes through it: listing records, creating suppliers and expenses, resolving references,
//! building reports, and exporting or restoring a `BackupDocument`.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::{
    BackupDocument, Expense, ExpenseFields, FileAttachment, Id, InvoiceUpload, Supplier,
    SupplierFields,
};
use crate::report::{DateRange, Report};
use anyhow::Context;
use std::path::Path;
use tracing::{debug, info};

/// An open ledger backed by a single store.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Db,
}

impl Ledger {
    /// Opens the store at `path`, creating and provisioning it if necessary. Opening an existing
    /// store leaves its data untouched.
    ///
    /// # Errors
    /// - `Initialization` if the file cannot be opened, is not a ledger store, or was written by a
    ///   newer schema version.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Db::open(path)
            .await
            .context("Unable to initialize the ledger store")
            .pub_result(ErrorType::Initialization)?;
        Ok(Self { db })
    }

    /// Returns all suppliers in key order.
    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        self.db.read_all().await.pub_result(ErrorType::Storage)
    }

    /// Returns all expenses, newest first. Expenses on the same date are ordered by descending key.
    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self.db.read_all().await.pub_result(ErrorType::Storage)?;
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(expenses)
    }

    pub async fn get_supplier(&self, id: Id) -> Result<Option<Supplier>> {
        self.db.get(id).await.pub_result(ErrorType::Storage)
    }

    /// Returns the file with key `id`, or `None` if no such file exists.
    pub async fn get_file(&self, id: Id) -> Result<Option<FileAttachment>> {
        self.db.get(id).await.pub_result(ErrorType::Storage)
    }

    /// Looks up a supplier reference. An absent or dangling reference resolves to `None`. Only a
    /// storage failure is an error.
    pub async fn resolve_supplier(&self, supplier_id: Option<Id>) -> Result<Option<Supplier>> {
        match supplier_id {
            Some(id) => self.get_supplier(id).await,
            None => Ok(None),
        }
    }

    /// Looks up the invoice attached to `expense`. An absent or dangling reference resolves to
    /// `None`.
    pub async fn resolve_invoice(&self, expense: &Expense) -> Result<Option<FileAttachment>> {
        match expense.invoice_file_id {
            Some(id) => self.get_file(id).await,
            None => Ok(None),
        }
    }

    /// Validates and inserts a new supplier, returning its key.
    pub async fn create_supplier(&self, fields: SupplierFields) -> Result<Id> {
        let supplier = fields.validate()?;
        let id = self
            .db
            .insert(&supplier)
            .await
            .pub_result(ErrorType::Storage)?;
        info!("Created supplier {id} '{}'", supplier.name);
        Ok(id)
    }

    /// Validates and inserts a new expense, returning its key.
    ///
    /// - The supplier's current name is copied into the expense. It is not kept in sync later.
    /// - A non-empty `invoice` is stored first, so the expense only ever references a file that
    ///   already exists.
    ///
    /// Nothing is written if validation fails. If the expense insert fails after the invoice was
    /// stored, the invoice remains as an unreferenced file.
    pub async fn create_expense(
        &self,
        fields: ExpenseFields,
        invoice: Option<InvoiceUpload>,
    ) -> Result<Id> {
        let mut expense = fields.validate()?;

        if let Some(supplier) = self.resolve_supplier(expense.supplier_id).await? {
            expense.supplier_name = supplier.name;
        }

        if let Some(file) = invoice.and_then(InvoiceUpload::into_attachment) {
            let file_id = self.db.insert(&file).await.pub_result(ErrorType::Storage)?;
            debug!("Stored invoice '{}' as file {file_id}", file.name);
            expense.invoice_file_id = Some(file_id);
        }

        let id = self
            .db
            .insert(&expense)
            .await
            .pub_result(ErrorType::Storage)?;
        info!(
            "Created expense {id} on {} for {} ({})",
            expense.date,
            expense.amount,
            expense.supplier_label()
        );
        Ok(id)
    }

    /// Builds the category report for the expenses in `range`.
    ///
    /// # Errors
    /// - `Storage` if the expenses cannot be read.
    /// - `Validation` if a total is beyond the range of `Decimal`.
    pub async fn build_report(&self, range: &DateRange) -> Result<Report> {
        let expenses: Vec<Expense> = self.db.read_all().await.pub_result(ErrorType::Storage)?;
        Report::build(&expenses, range).pub_result(ErrorType::Validation)
    }

    /// Reads every collection in full into one document.
    pub async fn export_all(&self) -> Result<BackupDocument> {
        let doc = BackupDocument {
            suppliers: self.db.read_all().await.pub_result(ErrorType::Storage)?,
            expenses: self.db.read_all().await.pub_result(ErrorType::Storage)?,
            files: self.db.read_all().await.pub_result(ErrorType::Storage)?,
        };
        info!(
            "Exported {} suppliers, {} expenses and {} files",
            doc.suppliers.len(),
            doc.expenses.len(),
            doc.files.len()
        );
        Ok(doc)
    }

    /// Restores `doc` by upserting every entry at its own key: suppliers, then files, then
    /// expenses. Records not mentioned in `doc` are left alone, and running the same import twice
    /// gives the same result as running it once.
    ///
    /// The import is all-or-nothing. Every entry must carry a key and every file size must fit the
    /// store. Otherwise the call fails with `Validation` before anything is written. A storage
    /// failure part way through is rolled back.
    pub async fn import_all(&self, doc: &BackupDocument) -> Result<()> {
        doc.check()?;
        self.db
            .upsert_document(doc)
            .await
            .pub_result(ErrorType::Storage)?;
        info!(
            "Imported {} suppliers, {} files and {} expenses",
            doc.suppliers.len(),
            doc.files.len(),
            doc.expenses.len()
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &Db {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, UNCATEGORISED, UNKNOWN_SUPPLIER};
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_open_bad_path_is_initialization_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("dir").join("ledger.sqlite");
        let e = Ledger::open(&path).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Initialization);
    }

    #[tokio::test]
    async fn test_insert_then_list_includes_record_once() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let fields = SupplierFields {
            name: "Acme".into(),
            address: Some("1 Main St".into()),
            ..Default::default()
        };
        let id = ledger.create_supplier(fields).await.unwrap();
        let other = ledger.create_supplier(SupplierFields::new("Bolt")).await.unwrap();
        assert_ne!(id, other);

        let suppliers = ledger.list_suppliers().await.unwrap();
        let matching: Vec<&Supplier> = suppliers.iter().filter(|s| s.id == Some(id)).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Acme");
        assert_eq!(matching[0].address.as_deref(), Some("1 Main St"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_without_writing() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let e = ledger.create_supplier(SupplierFields::new("")).await.unwrap_err();
        assert!(e.is_validation());

        let invoice = InvoiceUpload::new("inv.pdf", "application/pdf", vec![1, 2, 3]);
        let e = ledger
            .create_expense(ExpenseFields::new("", "Travel", amount("1")), Some(invoice))
            .await
            .unwrap_err();
        assert!(e.is_validation());

        let doc = ledger.export_all().await.unwrap();
        assert_eq!(doc.record_count(), 0);
    }

    #[tokio::test]
    async fn test_acme_scenario() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let acme = ledger.create_supplier(SupplierFields::new("Acme")).await.unwrap();
        assert_eq!(acme, 1);

        let fields = ExpenseFields::new("2024-07-15", "Utilities", amount("120.50"))
            .supplier(acme)
            .sub_category("Power");
        ledger.create_expense(fields, None).await.unwrap();

        let range = DateRange::new(Some("2024-07-01"), Some("2024-07-31"));
        let report = ledger.build_report(&range).await.unwrap();
        let utilities = report.category("Utilities").unwrap();
        assert_eq!(utilities.total, amount("120.50"));
        assert_eq!(utilities.sub_category("Power").unwrap().total, amount("120.50"));
        assert_eq!(report.total, amount("120.50"));
    }

    #[tokio::test]
    async fn test_travel_scenario() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        for (sub, value) in [("Flights", "200"), ("Hotels", "150"), ("", "50")] {
            let fields = ExpenseFields::new("2024-09-01", "Travel", amount(value)).sub_category(sub);
            ledger.create_expense(fields, None).await.unwrap();
        }
        let report = ledger.build_report(&DateRange::all()).await.unwrap();
        let travel = report.category("Travel").unwrap();
        assert_eq!(travel.total, amount("400"));
        assert_eq!(travel.sub_category("Flights").unwrap().total, amount("200"));
        assert_eq!(travel.sub_category("Hotels").unwrap().total, amount("150"));
        assert_eq!(travel.sub_category(UNCATEGORISED).unwrap().total, amount("50"));
    }

    #[tokio::test]
    async fn test_supplier_name_is_a_snapshot() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let id = ledger.create_supplier(SupplierFields::new("Acme")).await.unwrap();
        let fields = ExpenseFields::new("2024-07-15", "Utilities", amount("10")).supplier(id);
        ledger.create_expense(fields, None).await.unwrap();

        // Rename the supplier through a restore.
        let renamed = BackupDocument {
            suppliers: vec![Supplier {
                id: Some(id),
                name: "Acme Pty Ltd".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        ledger.import_all(&renamed).await.unwrap();

        let expenses = ledger.list_expenses().await.unwrap();
        assert_eq!(expenses[0].supplier_name, "Acme");
        let current = ledger.resolve_supplier(expenses[0].supplier_id).await.unwrap();
        assert_eq!(current.unwrap().name, "Acme Pty Ltd");
    }

    #[tokio::test]
    async fn test_unknown_supplier_reference() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let fields = ExpenseFields::new("2024-07-15", "Cash", amount("5")).supplier(77);
        ledger.create_expense(fields, None).await.unwrap();

        let expenses = ledger.list_expenses().await.unwrap();
        assert_eq!(expenses[0].supplier_id, Some(77));
        assert_eq!(expenses[0].supplier_label(), UNKNOWN_SUPPLIER);
        assert!(ledger
            .resolve_supplier(expenses[0].supplier_id)
            .await
            .unwrap()
            .is_none());
        assert!(ledger.resolve_supplier(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invoice_is_stored_before_expense() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let invoice = InvoiceUpload::new("power.pdf", "application/pdf", b"%PDF-1.4".to_vec());
        let fields = ExpenseFields::new("2024-07-15", "Utilities", amount("120.50"));
        ledger.create_expense(fields, Some(invoice)).await.unwrap();

        let expense = ledger.list_expenses().await.unwrap().remove(0);
        let file = ledger.resolve_invoice(&expense).await.unwrap().unwrap();
        assert_eq!(file.name, "power.pdf");
        assert_eq!(file.size, 8);
        assert_eq!(file.data, b"%PDF-1.4".to_vec());
    }

    #[tokio::test]
    async fn test_empty_invoice_is_not_stored() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let invoice = InvoiceUpload::new("empty.pdf", "application/pdf", Vec::new());
        let fields = ExpenseFields::new("2024-07-15", "Utilities", amount("1"));
        ledger.create_expense(fields, Some(invoice)).await.unwrap();

        let doc = ledger.export_all().await.unwrap();
        assert!(doc.files.is_empty());
        assert_eq!(doc.expenses[0].invoice_file_id, None);
    }

    #[tokio::test]
    async fn test_dangling_invoice_reference_is_tolerated() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let doc = BackupDocument {
            expenses: vec![Expense {
                id: Some(1),
                date: "2024-07-15".into(),
                category: "Utilities".into(),
                amount: amount("30"),
                invoice_file_id: Some(404),
                ..Default::default()
            }],
            ..Default::default()
        };
        ledger.import_all(&doc).await.unwrap();

        let expenses = ledger.list_expenses().await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert!(ledger.resolve_invoice(&expenses[0]).await.unwrap().is_none());
        assert!(ledger.get_file(404).await.unwrap().is_none());
        let report = ledger.build_report(&DateRange::all()).await.unwrap();
        assert_eq!(report.total, amount("30"));
    }

    #[tokio::test]
    async fn test_list_expenses_newest_first() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        for date in ["2024-07-02", "2024-08-01", "2024-07-02", "2023-12-31"] {
            let fields = ExpenseFields::new(date, "Misc", amount("1"));
            ledger.create_expense(fields, None).await.unwrap();
        }
        let order: Vec<(String, Option<Id>)> = ledger
            .list_expenses()
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.date, e.id))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2024-08-01".to_string(), Some(2)),
                ("2024-07-02".to_string(), Some(3)),
                ("2024-07-02".to_string(), Some(1)),
                ("2023-12-31".to_string(), Some(4)),
            ]
        );
    }

    #[tokio::test]
    async fn test_export_import_round_trip_into_empty_store() {
        let source = TestEnv::new().await;
        let ledger = source.ledger();
        let acme = ledger.create_supplier(SupplierFields::new("Acme")).await.unwrap();
        let invoice = InvoiceUpload::new("a.png", "image/png", vec![137, 80, 78, 71]);
        let fields = ExpenseFields::new("2024-07-15", "Utilities", amount("120.50"))
            .supplier(acme)
            .description("July");
        ledger.create_expense(fields, Some(invoice)).await.unwrap();
        let exported = ledger.export_all().await.unwrap();

        // Through the textual form, as a real backup would travel.
        let json = exported.to_json().unwrap();
        let parsed = BackupDocument::from_json(&json).unwrap();

        let target = TestEnv::new().await;
        target.ledger().import_all(&parsed).await.unwrap();
        let restored = target.ledger().export_all().await.unwrap();
        assert_eq!(restored, exported);
    }

    #[tokio::test]
    async fn test_round_trip_keeps_precise_and_large_amounts() {
        let source = TestEnv::new().await;
        let ledger = source.ledger();
        let amounts = [
            "123456789012345.67",
            "-98765432109876543.21",
            "0.0000000000000000000000000001",
            "79228162514264337593543950335",
            "0.30000000000000004",
            "1000000000000000000000.01",
        ];
        for (day, value) in amounts.iter().enumerate() {
            let date = format!("2024-07-{:02}", day + 1);
            let fields = ExpenseFields::new(date.as_str(), "Large", amount(value));
            ledger.create_expense(fields, None).await.unwrap();
        }
        let exported = ledger.export_all().await.unwrap();
        let parsed = BackupDocument::from_json(&exported.to_json().unwrap()).unwrap();

        let target = TestEnv::new().await;
        target.ledger().import_all(&parsed).await.unwrap();
        let restored = target.ledger().export_all().await.unwrap();
        assert_eq!(restored, exported);
        for value in amounts {
            assert!(
                restored.expenses.iter().any(|e| e.amount == amount(value)),
                "{value} was not restored exactly"
            );
        }
    }

    #[tokio::test]
    async fn test_report_overflow_is_an_error_not_a_panic() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let doc = BackupDocument::from_json(
            r#"{"expenses": [
                {"id": 1, "date": "2024-07-01", "category": "C", "amount": "79228162514264337593543950335"},
                {"id": 2, "date": "2024-07-02", "category": "C", "amount": "1"}
            ]}"#,
        )
        .unwrap();
        ledger.import_all(&doc).await.unwrap();

        let e = ledger.build_report(&DateRange::all()).await.unwrap_err();
        assert!(e.is_validation());
        let first_day = DateRange::new(Some("2024-07-01"), Some("2024-07-01"));
        let report = ledger.build_report(&first_day).await.unwrap();
        assert_eq!(report.total, amount("79228162514264337593543950335"));
    }

    #[tokio::test]
    async fn test_import_rejects_oversized_file_and_export_still_works() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        ledger.create_supplier(SupplierFields::new("Acme")).await.unwrap();
        let doc = BackupDocument::from_json(
            r#"{"files": [
                {"id": 1, "name": "a.pdf", "type": "application/pdf",
                 "size": 18446744073709551615, "data": "aGk="}
            ]}"#,
        )
        .unwrap();
        let e = ledger.import_all(&doc).await.unwrap_err();
        assert!(e.is_validation());

        let exported = ledger.export_all().await.unwrap();
        assert!(exported.files.is_empty());
        assert_eq!(exported.suppliers.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_file_is_refused_by_the_store() {
        let env = TestEnv::new().await;
        let file = FileAttachment {
            id: Some(1),
            name: "a.pdf".into(),
            size: u64::MAX,
            data: b"hi".to_vec(),
            ..Default::default()
        };
        let doc = BackupDocument {
            files: vec![file],
            ..Default::default()
        };
        // Bypasses the document check, so the store itself must refuse the value.
        assert!(env.ledger().db().upsert_document(&doc).await.is_err());
        assert!(env.ledger().export_all().await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_import_is_idempotent_and_overwrites() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        for _ in 0..5 {
            ledger.create_supplier(SupplierFields::new("Filler")).await.unwrap();
        }
        let before = ledger.get_supplier(5).await.unwrap().unwrap();
        assert_eq!(before.name, "Filler");

        let doc = BackupDocument::from_json(r#"{ "suppliers": [{"id": 5, "name": "X"}] }"#).unwrap();
        ledger.import_all(&doc).await.unwrap();
        let once = ledger.export_all().await.unwrap();
        assert_eq!(ledger.get_supplier(5).await.unwrap().unwrap().name, "X");

        ledger.import_all(&doc).await.unwrap();
        let twice = ledger.export_all().await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.suppliers.len(), 5);
    }

    #[tokio::test]
    async fn test_import_missing_key_writes_nothing() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        let doc = BackupDocument::from_json(
            r#"{
                "suppliers": [{"id": 1, "name": "Good"}],
                "expenses": [{"date": "2024-07-01", "category": "C", "amount": 3}]
            }"#,
        )
        .unwrap();
        let e = ledger.import_all(&doc).await.unwrap_err();
        assert!(e.is_validation());
        assert!(ledger.list_suppliers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_empty_data() {
        let env = TestEnv::new().await;
        let ledger = env.ledger();
        ledger.create_supplier(SupplierFields::new("Acme")).await.unwrap();
        ledger.db().close().await;

        let e = ledger.list_suppliers().await.unwrap_err();
        assert!(e.is_storage());
        let e = ledger.build_report(&DateRange::all()).await.unwrap_err();
        assert!(e.is_storage());
    }
}
