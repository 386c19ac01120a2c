//! Database schema migrations.
//!
//! Migration files are stored in this directory as `migration_NN_up.sql`, each upgrading the
//! schema from version `NN-1` to version `NN`. Migrations only ever add collections, so there are
//! no down migrations.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::error::Re;

/// A single additive schema migration.
struct Migration {
    /// The version this migration brings the database to.
    version: i32,
    sql: &'static str,
}

/// All available migrations in order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migration_01_up.sql"),
}];

/// The schema version this build of the crate expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

/// Creates the `schema_version` table if needed and returns the recorded version, or 0 for a
/// brand new database.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Re<i32> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;

    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    Ok(row.0.unwrap_or(0))
}

/// Runs migrations to bring the database from `current_ver` up to `target_ver`.
///
/// Each migration is executed within a transaction that includes the schema_version update.
/// A database that is already newer than `target_ver` was written by a newer build and is
/// refused rather than touched.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Re<()> {
    if current_ver == target_ver {
        debug!("Database already at target version {target_ver}, no migrations needed");
        return Ok(());
    }
    if current_ver > target_ver {
        bail!(
            "Database schema version {current_ver} is newer than the supported version \
            {target_ver}. Is a newer version of accountant available?"
        );
    }

    validate_migrations(current_ver, target_ver)?;

    for version in (current_ver + 1)..=target_ver {
        let migration = MIGRATIONS
            .iter()
            .find(|m| m.version == version)
            .with_context(|| format!("Migration {version} not found"))?;

        debug!("Running migration {version:02}");
        run_single_migration(pool, migration.sql, version).await?;
    }

    debug!("Migration complete, schema now at version {target_ver}");
    Ok(())
}

async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Re<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;

    Ok(())
}

fn validate_migrations(current_version: i32, target_version: i32) -> Re<()> {
    for version in (current_version + 1)..=target_version {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!(
                "Migration {version} is missing but required to migrate from version \
                {current_version} to {target_version}"
            );
        }
    }
    Ok(())
}
