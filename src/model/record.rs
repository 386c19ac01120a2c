use crate::error::Re;
use crate::model::{Collection, Id};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

/// A single column value as written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Null,
    Integer(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Null)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map(Value::Integer).unwrap_or(Value::Null)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

/// A record that lives in one of the ledger's collections.
///
/// The key is held as `Option<Id>`: records built by a caller have no key until the store
/// assigns one, and records read back from the store always have one.
pub(crate) trait Record: Sized + Send + Unpin + for<'r> FromRow<'r, SqliteRow> {
    const COLLECTION: Collection;

    /// Non-key column names, in the same order as `values`.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<Id>;

    /// Fails when a field has no lossless column representation.
    fn values(&self) -> Re<Vec<Value>>;
}

/// Maps a value conversion failure into the error type `FromRow` expects.
pub(crate) fn decode_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}
