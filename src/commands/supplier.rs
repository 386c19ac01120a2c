//! Supplier commands: `supplier add` and `supplier list`.

use crate::args::SupplierAddArgs;
use crate::commands::Out;
use crate::model::{Id, Supplier, SupplierFields};
use crate::{Config, Result};

/// Adds a supplier and returns its id.
pub async fn add_supplier(config: Config, args: SupplierAddArgs) -> Result<Out<Id>> {
    let fields = SupplierFields {
        name: args.name,
        address: args.address,
        phone: args.phone,
        default_category: args.category,
        default_sub_category: args.sub_category,
    };
    let id = config.ledger().create_supplier(fields).await?;
    Ok(Out::new(format!("Added supplier with ID: {id}"), id))
}

/// Lists every supplier in id order.
pub async fn list_suppliers(config: Config) -> Result<Out<Vec<Supplier>>> {
    let suppliers = config.ledger().list_suppliers().await?;
    let mut message = format!("{} supplier(s)", suppliers.len());
    for s in &suppliers {
        message.push_str(&format!("\n{}", supplier_line(s)));
    }
    Ok(Out::new(message, suppliers))
}

fn supplier_line(s: &Supplier) -> String {
    let mut line = format!("{:>5}  {}", s.id.unwrap_or_default(), s.name);
    if let Some(category) = &s.default_category {
        line.push_str(&format!(
            " [{category}/{}]",
            s.default_sub_category.as_deref().unwrap_or("-")
        ));
    }
    if let Some(phone) = &s.phone {
        line.push_str(&format!(" {phone}"));
    }
    line
}
