//! The storage engine: reading, inserting and upserting ledger records in an embedded SQLite
//! database.
//!
//! Each `Collection` is a table keyed by an autoincrement `id`. Every operation is a single
//! statement or a single transaction, so a failed write leaves the collection as it was.

mod migrations;

use crate::error::Re;
use crate::model::record::{Record, Value};
use crate::model::{BackupDocument, Id};
use anyhow::{ensure, Context};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, trace};

/// A handle to the open store. Cloning is cheap and shares the same connection pool.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Opens the SQLite file at `path`, creating it if it does not exist
    /// - Provisions the suppliers, expenses and files collections if they are absent
    /// - Leaves an already initialized store untouched
    pub(crate) async fn open(path: impl AsRef<Path>) -> Re<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open the store at {}", path.display()))?;

        let version = migrations::bootstrap(&pool)
            .await
            .context("Unable to read the store's schema version")?;
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;

        debug!("Opened store at {}", path.display());
        Ok(Self { pool })
    }

    /// Returns every record in `T`'s collection, ordered by key.
    pub(crate) async fn read_all<T: Record>(&self) -> Re<Vec<T>> {
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id",
            T::COLUMNS.join(", "),
            T::COLLECTION.table()
        );
        sqlx::query_as::<_, T>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Unable to read the {} collection", T::COLLECTION))
    }

    /// Returns the record with key `id`, or `None` if there is no such record.
    pub(crate) async fn get<T: Record>(&self, id: Id) -> Re<Option<T>> {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?",
            T::COLUMNS.join(", "),
            T::COLLECTION.table()
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to read {id} from the {} collection", T::COLLECTION))
    }

    /// Persists `record` under a freshly assigned key and returns that key. Any key already on
    /// `record` is ignored.
    pub(crate) async fn insert<T: Record>(&self, record: &T) -> Re<Id> {
        let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            T::COLLECTION.table(),
            T::COLUMNS.join(", "),
        );
        let query = bind_all(sqlx::query(&sql), record.values()?);
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to insert into the {} collection", T::COLLECTION))?;
        let id = result.last_insert_rowid();
        debug!("Inserted {} {id}", T::COLLECTION);
        Ok(id)
    }

    /// Replaces the record stored at `record`'s key, or creates it at exactly that key.
    #[cfg(test)]
    pub(crate) async fn upsert<T: Record>(&self, record: &T) -> Re<Id> {
        upsert_with(&self.pool, record).await
    }

    /// Upserts every record of `doc` in one transaction: suppliers, then files, then expenses.
    /// Either all records are written or none are.
    pub(crate) async fn upsert_document(&self, doc: &BackupDocument) -> Re<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Unable to begin the restore transaction")?;

        for supplier in &doc.suppliers {
            upsert_with(&mut *tx, supplier).await?;
        }
        for file in &doc.files {
            upsert_with(&mut *tx, file).await?;
        }
        for expense in &doc.expenses {
            upsert_with(&mut *tx, expense).await?;
        }

        tx.commit()
            .await
            .context("Unable to commit the restore transaction")?;
        Ok(())
    }

    /// Closes the pool. Any later operation fails.
    #[cfg(test)]
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

async fn upsert_with<'c, E, T>(executor: E, record: &T) -> Re<Id>
where
    E: Executor<'c, Database = Sqlite>,
    T: Record,
{
    let id = record.id();
    ensure!(
        id.is_some(),
        "A record without a key cannot be upserted into the {} collection",
        T::COLLECTION
    );
    let updates = T::COLUMNS
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; T::COLUMNS.len() + 1].join(", ");
    let sql = format!(
        "INSERT INTO {} (id, {}) VALUES ({placeholders}) ON CONFLICT(id) DO UPDATE SET {updates}",
        T::COLLECTION.table(),
        T::COLUMNS.join(", "),
    );

    let mut values = vec![Value::from(id)];
    values.extend(record.values()?);
    bind_all(sqlx::query(&sql), values)
        .execute(executor)
        .await
        .with_context(|| format!("Unable to upsert into the {} collection", T::COLLECTION))?;

    trace!("Upserted {} {id:?}", T::COLLECTION);
    Ok(id.unwrap_or_default())
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<Value>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(i) => query.bind(i),
            Value::Text(s) => query.bind(s),
            Value::Blob(b) => query.bind(b),
        };
    }
    query
}
