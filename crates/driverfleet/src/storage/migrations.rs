//! Database schema versioning.
//!
//! The base tables are created idempotently from [`SCHEMA_STATEMENTS`]; the
//! schema version in the `metadata` table then decides which data migrations
//! still have to run.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Create all tables and bring the schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported \
                 version {CURRENT_VERSION}"
            ),
        });
    }

    for next in (version + 1)..=CURRENT_VERSION {
        migrate_to(conn, next)?;
        set_schema_version(conn, next)?;
    }

    Ok(())
}

/// Read the schema version; 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
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

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn migrate_to(conn: &Connection, version: i32) -> Result<()> {
    match version {
        // Base tables come from SCHEMA_STATEMENTS
        1 => Ok(()),
        2 => normalize_position_timestamps(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Rewrite naive `last_update` values as UTC RFC 3339 with millisecond precision.
///
/// Positions written by older tooling used `YYYY-MM-DD HH:MM:SS` or naive ISO
/// strings, which don't order correctly against the canonical form.
fn normalize_position_timestamps(conn: &Connection) -> Result<()> {
    let rewritten = conn.execute(
        r"
        UPDATE driver_locations
        SET last_update = strftime('%Y-%m-%dT%H:%M:%fZ', last_update)
        WHERE last_update NOT LIKE '%Z'
          AND strftime('%Y-%m-%dT%H:%M:%fZ', last_update) IS NOT NULL
        ",
        [],
    )?;
    if rewritten > 0 {
        info!(rows = rewritten, "Normalized legacy position timestamps");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn create_metadata_table(conn: &Connection) {
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        for table in ["drivers", "driver_locations", "metadata"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();

        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_schema_version_fresh_db() {
        let conn = create_test_db();
        create_metadata_table(&conn);

        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = create_test_db();
        create_metadata_table(&conn);
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_unknown_migration_version() {
        let conn = create_test_db();
        let err = migrate_to(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_legacy_timestamps_are_normalized() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();

        conn.execute(
            "INSERT INTO drivers (driver_id, name, vehicle_type, license_plate, rating, total_trips)
             VALUES ('DRV_001', 'Test', 'standard', 'T40001', 4.5, 10)",
            [],
        )
        .unwrap();
        for ts in [
            "2024-03-01 12:30:00",
            "2024-03-01T12:31:00.250000",
            "2024-03-01T12:32:00.000Z",
        ] {
            conn.execute(
                "INSERT INTO driver_locations (driver_id, latitude, longitude, last_update)
                 VALUES ('DRV_001', 40.7, -74.0, ?1)",
                [ts],
            )
            .unwrap();
        }

        initialize_schema(&conn).unwrap();

        let stamps: Vec<String> = conn
            .prepare("SELECT last_update FROM driver_locations ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(
            stamps,
            vec![
                "2024-03-01T12:30:00.000Z",
                "2024-03-01T12:31:00.250Z",
                "2024-03-01T12:32:00.000Z",
            ]
        );
    }

    #[test]
    fn test_indexes_created() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.iter().any(|n| n == "idx_locations_driver"));
        assert!(indexes.iter().any(|n| n == "idx_locations_availability"));
        assert!(indexes.iter().any(|n| n == "idx_drivers_vehicle_type"));
    }
}
