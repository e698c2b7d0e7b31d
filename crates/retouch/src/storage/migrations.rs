//! Database migration system for retouch.
//!
//! Each migration is a list of statements applied in one transaction. The
//! version reached is kept in the `metadata` table.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{
    CREATE_KIND_INDEX, CREATE_METADATA_TABLE, CREATE_OPERATIONS_TABLE,
    CREATE_PROTECTED_WORDS_TABLE, CREATE_TIMESTAMP_INDEX,
};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// A numbered schema change.
#[derive(Debug)]
struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "operation history",
        statements: &[
            CREATE_OPERATIONS_TABLE,
            CREATE_TIMESTAMP_INDEX,
            CREATE_KIND_INDEX,
        ],
    },
    Migration {
        version: 2,
        description: "protected words",
        statements: &[CREATE_PROTECTED_WORDS_TABLE],
    },
];

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Initialize the database schema.
///
/// Creates the metadata table, then applies every migration newer than the
/// stored version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration)?;
    }

    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in migration.statements {
        tx.execute(statement, []).map_err(|e| Error::DatabaseMigration {
            message: format!("migration {} ({}): {e}", migration.version, migration.description),
        })?;
    }
    set_schema_version(&tx, migration.version)?;
    tx.commit()?;
    info!(
        version = migration.version,
        description = migration.description,
        "Applied database migration"
    );
    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
