use crate::args::ConvertArgs;
use crate::commands::Out;
use crate::convert::csv_to_document;
use crate::error::{ErrorType, IntoResult};
use crate::{utils, Result};

/// Converts the suppliers and invoices CSV files into a backup document written to `args.out`.
/// This does not touch the ledger; run `accountant import` on the result to load it.
pub async fn convert(args: ConvertArgs) -> Result<Out<()>> {
    let suppliers = utils::read(&args.suppliers)
        .await
        .pub_result(ErrorType::Io)?;
    let invoices = utils::read(&args.invoices)
        .await
        .pub_result(ErrorType::Io)?;

    let doc = csv_to_document(&suppliers, &invoices)?;
    utils::write(&args.out, doc.to_json()?)
        .await
        .pub_result(ErrorType::Io)?;

    Ok(format!(
        "Wrote {} with {} supplier(s) and {} expense(s)",
        args.out.display(),
        doc.suppliers.len(),
        doc.expenses.len()
    )
    .into())
}
