//! Schema versioning for the local database.
//!
//! The version lives in the `metadata` table. Each step in
//! [`MIGRATIONS`] runs inside its own transaction together with the version
//! bump, so a failed step leaves the database at the previous version.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, MIGRATIONS};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// The schema version this build expects.
#[must_use]
pub fn current_version() -> i32 {
    i32::try_from(MIGRATIONS.len()).unwrap_or(i32::MAX)
}

/// Bring the schema up to [`current_version`].
///
/// # Errors
///
/// Returns an error if a migration fails or the database was written by a
/// newer build.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    let target = current_version();
    if version > target {
        return Err(Error::DatabaseMigration {
            message: format!("database schema version {version} is newer than supported {target}"),
        });
    }

    for next in (version + 1)..=target {
        run_migration(conn, next)?;
    }
    if version < target {
        info!(from = version, to = target, "database schema migrated");
    }
    Ok(())
}

/// Read the stored schema version; 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn run_migration(conn: &mut Connection, version: i32) -> Result<()> {
    let statements = usize::try_from(version - 1)
        .ok()
        .and_then(|index| MIGRATIONS.get(index))
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;

    debug!(version, "applying migration");
    let tx = conn.transaction()?;
    for statement in *statements {
        tx.execute(statement, [])
            .map_err(|err| Error::DatabaseMigration {
                message: format!("version {version}: {err}"),
            })?;
    }
    set_schema_version(&tx, version)?;
    tx.commit()?;
    Ok(())
}
