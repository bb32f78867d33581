//! SQLite schema migrations.
//!
//! Applied migration version is mirrored to `PRAGMA user_version`.

use rusqlite::Connection;

use crate::store::{StoreError, StoreErrorKind};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Latest schema version known by this binary.
pub(crate) fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Apply all pending migrations in one transaction.
pub(crate) fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let current = current_user_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(StoreError::new(StoreErrorKind::InvalidData)
            .with_backend("Sqlite")
            .with_source(UnsupportedVersion { current, latest }));
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::debug!(version = migration.version, "Applying store migration");
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;
    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

#[derive(Debug, thiserror::Error)]
#[error("database schema version {current} is newer than supported version {latest}")]
struct UnsupportedVersion {
    current: u32,
    latest: u32,
}
