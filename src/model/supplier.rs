use crate::error::{Error, Re};
use crate::model::record::{Record, Value};
use crate::model::{Collection, Id};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A business that expenses are paid to.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Used to prefill the category of new expenses for this supplier.
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub default_sub_category: Option<String>,
}

/// The fields a caller supplies to create a supplier.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFields {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub default_category: Option<String>,
    pub default_sub_category: Option<String>,
}

impl SupplierFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Rejects a blank name. The remaining fields are trimmed and blank values dropped.
    pub(crate) fn validate(self) -> Result<Supplier, Error> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("A supplier name is required"));
        }
        Ok(Supplier {
            id: None,
            name: name.to_string(),
            address: non_blank(self.address),
            phone: non_blank(self.phone),
            default_category: non_blank(self.default_category),
            default_sub_category: non_blank(self.default_sub_category),
        })
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Record for Supplier {
    const COLLECTION: Collection = Collection::Suppliers;
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "address",
        "phone",
        "default_category",
        "default_sub_category",
    ];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn values(&self) -> Re<Vec<Value>> {
        Ok(vec![
            self.name.clone().into(),
            self.address.clone().into(),
            self.phone.clone().into(),
            self.default_category.clone().into(),
            self.default_sub_category.clone().into(),
        ])
    }
}

impl<'r> FromRow<'r, SqliteRow> for Supplier {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            default_category: row.try_get("default_category")?,
            default_sub_category: row.try_get("default_sub_category")?,
        })
    }
}
