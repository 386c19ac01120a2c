//! Expense commands: `expense add` and `expense list`.

use crate::args::ExpenseAddArgs;
use crate::commands::Out;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{mime_type_for, Expense, ExpenseFields, Id, InvoiceUpload};
use crate::{utils, Config, Result};
use tracing::warn;

/// Adds an expense and returns its id.
///
/// When a supplier is given, its default category and sub-category fill in whichever of
/// `--category` and `--sub-category` were not given. An `--invoice` file is read and stored as the
/// expense's attachment, with its type guessed from the file extension.
///
/// # Errors
/// - `Validation` if the supplier does not exist or the expense is incomplete.
/// - `Io` if the invoice file cannot be read.
pub async fn add_expense(config: Config, args: ExpenseAddArgs) -> Result<Out<Id>> {
    let ledger = config.ledger();

    let mut fields = ExpenseFields::new(args.date, args.category.unwrap_or_default(), args.amount);
    fields.sub_category = args.sub_category;
    fields.description = args.description;

    if let Some(supplier_id) = args.supplier {
        let supplier = ledger
            .get_supplier(supplier_id)
            .await?
            .ok_or_else(|| Error::validation(format!("There is no supplier with ID {supplier_id}")))?;
        fields = fields.supplier(supplier_id);
        fields.prefill_from(&supplier);
    }

    let invoice = match &args.invoice {
        Some(path) => {
            let data = utils::read_bytes(path).await.pub_result(ErrorType::Io)?;
            let name = utils::file_name(path);
            if data.is_empty() {
                warn!("The invoice file {} is empty and will not be stored", path.display());
            }
            Some(InvoiceUpload::new(&name, mime_type_for(&name), data))
        }
        None => None,
    };

    let id = ledger.create_expense(fields, invoice).await?;
    Ok(Out::new(format!("Added expense with ID: {id}"), id))
}

/// Lists up to `limit` expenses, newest first.
pub async fn list_expenses(config: Config, limit: usize) -> Result<Out<Vec<Expense>>> {
    let mut expenses = config.ledger().list_expenses().await?;
    let total = expenses.len();
    expenses.truncate(limit);

    let mut message = if expenses.len() < total {
        format!("Showing {} of {total} expense(s)", expenses.len())
    } else {
        format!("{total} expense(s)")
    };
    for e in &expenses {
        message.push_str(&format!("\n{}", expense_line(e)));
    }
    Ok(Out::new(message, expenses))
}

fn expense_line(e: &Expense) -> String {
    let mut line = format!(
        "{:>5}  {} | {} | {}/{} | {}",
        e.id.unwrap_or_default(),
        e.date,
        e.supplier_label(),
        e.category,
        e.sub_category.as_deref().unwrap_or("-"),
        e.amount
    );
    if let Some(description) = &e.description {
        line.push_str(&format!(" | {description}"));
    }
    if let Some(file_id) = e.invoice_file_id {
        line.push_str(&format!(" | invoice {file_id}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, SupplierFields};
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn args(date: &str, amount: &str) -> ExpenseAddArgs {
        ExpenseAddArgs {
            date: date.into(),
            amount: Amount::from_str(amount).unwrap(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_expense_prefills_from_supplier() {
        let env = TestEnv::new().await;
        let supplier_id = env
            .ledger()
            .create_supplier(SupplierFields {
                name: "Acme".into(),
                default_category: Some("Utilities".into()),
                default_sub_category: Some("Electricity".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut a = args("2024-07-15", "120.50");
        a.supplier = Some(supplier_id);
        a.sub_category = Some("Gas".into());
        let out = add_expense(env.config(), a).await.unwrap();
        let id = *out.structure().unwrap();

        let expenses = env.ledger().list_expenses().await.unwrap();
        let e = expenses.iter().find(|e| e.id == Some(id)).unwrap();
        assert_eq!(e.supplier_name, "Acme");
        assert_eq!(e.category, "Utilities");
        assert_eq!(e.sub_category.as_deref(), Some("Gas"));
    }

    #[tokio::test]
    async fn test_add_expense_unknown_supplier() {
        let env = TestEnv::new().await;
        let mut a = args("2024-07-15", "10");
        a.supplier = Some(77);
        a.category = Some("Travel".into());
        let e = add_expense(env.config(), a).await.unwrap_err();
        assert!(e.is_validation());
        assert!(env.ledger().list_expenses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_expense_with_invoice() {
        let env = TestEnv::new().await;
        let path = env.scratch("power-july.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let mut a = args("2024-07-15", "99");
        a.category = Some("Utilities".into());
        a.invoice = Some(path);
        add_expense(env.config(), a).await.unwrap();

        let expense = env.ledger().list_expenses().await.unwrap().remove(0);
        let file = env.ledger().resolve_invoice(&expense).await.unwrap().unwrap();
        assert_eq!(file.name, "power-july.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.size, 8);
        assert_eq!(file.data, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_add_expense_missing_invoice_file() {
        let env = TestEnv::new().await;
        let mut a = args("2024-07-15", "99");
        a.category = Some("Utilities".into());
        a.invoice = Some(env.scratch("nope.pdf"));
        let e = add_expense(env.config(), a).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Io);
    }

    #[tokio::test]
    async fn test_list_expenses_limit() {
        let env = TestEnv::new().await;
        for day in 1..=5 {
            let mut a = args(&format!("2024-08-0{day}"), "1");
            a.category = Some("Travel".into());
            add_expense(env.config(), a).await.unwrap();
        }

        let out = list_expenses(env.config(), 3).await.unwrap();
        assert!(out.message().starts_with("Showing 3 of 5 expense(s)"));
        let listed = out.structure().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].date, "2024-08-05");
        assert!(out.message().contains("Unknown | Travel/-"));
    }
}
