//! Database migration management for the PostgreSQL storage backend.
//!
//! Migrations are embedded in the binary as reversible up/down pairs and
//! tracked in the `_sqlx_migrations` table. The server can apply them on
//! startup; the CLI exposes `up`, `down`, `redo`, `status` and `version`.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result, is_undefined_table};

/// Embedded migrations in chronological order: (version, description, up, down).
const EMBEDDED: &[(i64, &str, &str, &str)] = &[
    (
        20250301000001,
        "orders_schema",
        include_str!("../../migrations/20250301000001_orders_schema.up.sql"),
        include_str!("../../migrations/20250301000001_orders_schema.down.sql"),
    ),
    (
        20250301000002,
        "orders_updated_at_index",
        include_str!("../../migrations/20250301000002_orders_updated_at_index.up.sql"),
        include_str!("../../migrations/20250301000002_orders_updated_at_index.down.sql"),
    ),
];

/// Applied state of one embedded migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: &'static str,
    pub installed_on: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.installed_on.is_some()
    }
}

fn migration(
    version: i64,
    description: &'static str,
    kind: MigrationType,
    sql: &'static str,
) -> Migration {
    Migration {
        version,
        description: Cow::Borrowed(description),
        migration_type: kind,
        sql: Cow::Borrowed(sql),
        checksum: Cow::Borrowed(&[]), // Empty checksum for embedded migrations
        no_tx: false,
    }
}

fn build_migrations() -> Vec<Migration> {
    EMBEDDED
        .iter()
        .flat_map(|&(version, description, up, down)| {
            [
                migration(version, description, MigrationType::ReversibleUp, up),
                migration(version, description, MigrationType::ReversibleDown, down),
            ]
        })
        .collect()
}

fn migrator() -> Migrator {
    Migrator {
        migrations: Cow::Owned(build_migrations()),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    }
}

/// Versions of every embedded migration, oldest first.
pub fn embedded_versions() -> Vec<i64> {
    EMBEDDED.iter().map(|(version, ..)| *version).collect()
}

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    info!(count = EMBEDDED.len(), "Running database migrations (embedded)");

    migrator()
        .run(pool)
        .await
        .map_err(|e| PostgresError::migration(format!("Migration failed: {e}")))?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// Reverts the `steps` most recently applied migrations.
///
/// Returns the reverted versions, newest first. `steps == 0` is treated as 1.
#[instrument(skip(pool))]
pub async fn undo(pool: &PgPool, steps: usize) -> Result<Vec<i64>> {
    let steps = steps.max(1);
    let mut applied: Vec<i64> = applied_versions(pool).await?.into_keys().collect();
    applied.reverse();

    if applied.is_empty() {
        info!("No applied migrations to revert");
        return Ok(Vec::new());
    }

    let target = applied.get(steps).copied().unwrap_or(0);
    migrator()
        .undo(pool, target)
        .await
        .map_err(|e| PostgresError::migration(format!("Revert failed: {e}")))?;

    let reverted: Vec<i64> = applied.into_iter().take(steps).collect();
    info!(?reverted, target, "Database migrations reverted");
    Ok(reverted)
}

/// Reverts the latest migration and applies it again.
#[instrument(skip(pool))]
pub async fn redo(pool: &PgPool) -> Result<()> {
    undo(pool, 1).await?;
    run(pool).await
}

/// Lists every embedded migration with its applied state.
pub async fn status(pool: &PgPool) -> Result<Vec<MigrationStatus>> {
    let applied = applied_versions(pool).await?;
    Ok(EMBEDDED
        .iter()
        .map(|&(version, description, ..)| MigrationStatus {
            version,
            description,
            installed_on: applied.get(&version).copied(),
        })
        .collect())
}

/// Returns the latest applied version, or 0 when nothing is applied.
pub async fn version(pool: &PgPool) -> Result<i64> {
    Ok(applied_versions(pool)
        .await?
        .into_keys()
        .next_back()
        .unwrap_or(0))
}

async fn applied_versions(pool: &PgPool) -> Result<BTreeMap<i64, DateTime<Utc>>> {
    let rows: std::result::Result<Vec<(i64, DateTime<Utc>)>, _> = query_as(
        "SELECT version, installed_on FROM _sqlx_migrations WHERE success ORDER BY version",
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => Ok(rows.into_iter().collect()),
        Err(e) if is_undefined_table(&e) => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_versions_are_ordered() {
        let versions = embedded_versions();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_every_migration_is_reversible() {
        let migrations = build_migrations();
        assert_eq!(migrations.len(), EMBEDDED.len() * 2);
        for version in embedded_versions() {
            let kinds: Vec<_> = migrations
                .iter()
                .filter(|m| m.version == version)
                .map(|m| m.migration_type)
                .collect();
            assert_eq!(
                kinds,
                [MigrationType::ReversibleUp, MigrationType::ReversibleDown]
            );
        }
    }

    #[test]
    fn test_schema_creates_order_tables() {
        let (_, _, up, down) = EMBEDDED[0];
        for table in ["orders", "deliveries", "payments", "items"] {
            assert!(up.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
            assert!(down.contains(&format!("DROP TABLE IF EXISTS {table}")));
        }
        assert!(up.contains("raw_payload        JSONB"));
    }
}
