//! Storage layer for driverfleet.
//!
//! This module provides `SQLite`-based persistent storage for driver profiles
//! and their position history. It implements the write contract used by the
//! pipeline ([`DriverSink`]) and the read contract used by nearby queries
//! ([`Storage::current_drivers`]).

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::{DriverPosition, DriverProfile, DriverRecord, VehicleType};
use crate::error::{Error, Result};
use crate::persist::DriverSink;

/// ETA reported when no current positions exist.
const DEFAULT_AVG_ETA_MINUTES: f64 = 6.5;

/// Columns selected by every profile + position query, in row order.
const DRIVER_RECORD_COLUMNS: &str = r"
    d.driver_id, d.name, d.vehicle_type, d.license_plate, d.rating, d.total_trips,
    l.latitude, l.longitude, l.is_available, l.eta_minutes, l.last_update
";

/// Restricts `driver_locations l` to the latest row of each driver.
const LATEST_POSITION_CLAUSE: &str = r"
    l.id = (
        SELECT l2.id FROM driver_locations l2
        WHERE l2.driver_id = l.driver_id
        ORDER BY l2.last_update DESC, l2.id DESC
        LIMIT 1
    )
";

/// Storage engine for drivers and positions.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Readers see either the pre- or post-write state of a run
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Open the database for a command that only reads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreRead`] if the database cannot be opened.
    pub fn open_for_read(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path).map_err(Error::into_store_read)
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a profile, replacing any existing profile with the same `driver_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_profile(&self, profile: &DriverProfile) -> Result<()> {
        insert_profile(&self.conn, profile)
    }

    /// Append a position row for a driver. Existing rows are never touched.
    ///
    /// Returns the row ID of the new position.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_position(&self, driver_id: &str, position: &DriverPosition) -> Result<i64> {
        insert_position(&self.conn, driver_id, position)
    }

    /// Upsert a profile and append its position in one transaction.
    ///
    /// If either write fails, neither is applied and the previous profile and
    /// position stay current.
    ///
    /// Returns the row ID of the new position.
    ///
    /// # Errors
    ///
    /// Returns an error if either write or the commit fails.
    pub fn write_driver(
        &mut self,
        profile: &DriverProfile,
        position: &DriverPosition,
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;
        insert_profile(&tx, profile)?;
        let id = insert_position(&tx, &profile.driver_id, position)?;
        tx.commit()?;
        Ok(id)
    }

    /// Get a profile by its driver ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_profile(&self, driver_id: &str) -> Result<Option<DriverProfile>> {
        let profile = self
            .conn
            .query_row(
                r"
                SELECT driver_id, name, vehicle_type, license_plate, rating, total_trips
                FROM drivers WHERE driver_id = ?1
                ",
                [driver_id],
                |row| Self::row_to_profile(row, 0),
            )
            .optional()?;
        Ok(profile)
    }

    /// Get the current position of every driver updated at or after `cutoff`.
    ///
    /// Only the latest position of each driver is considered; drivers whose
    /// latest position is older than `cutoff` are left out. Results are ordered
    /// by `last_update` descending, then `driver_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn current_drivers(
        &self,
        cutoff: DateTime<Utc>,
        vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<DriverRecord>> {
        let sql = format!(
            r"
            SELECT {DRIVER_RECORD_COLUMNS}
            FROM drivers d
            JOIN driver_locations l ON l.driver_id = d.driver_id
            WHERE {LATEST_POSITION_CLAUSE}
              AND l.last_update >= ?1
              AND (?2 IS NULL OR d.vehicle_type = ?2)
            ORDER BY l.last_update DESC, d.driver_id ASC
            "
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![format_timestamp(cutoff), vehicle_type.map(|vt| vt.as_str())],
                Self::row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "Loaded current driver positions");
        Ok(records)
    }

    /// Full position history of a driver, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn position_history(&self, driver_id: &str) -> Result<Vec<DriverPosition>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT latitude, longitude, is_available, eta_minutes, last_update
            FROM driver_locations WHERE driver_id = ?1
            ORDER BY last_update DESC, id DESC
            ",
        )?;

        let positions = stmt
            .query_map([driver_id], |row| Self::row_to_position(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(positions)
    }

    /// Count stored driver profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_drivers(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM drivers", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count stored position rows, including superseded ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_positions(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM driver_locations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Summarize fleet availability over positions updated at or after `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn fleet_stats(&self, cutoff: DateTime<Utc>) -> Result<FleetStats> {
        let total_drivers = self.count_drivers()?;

        let (available_drivers, avg_eta): (i64, Option<f64>) = self.conn.query_row(
            &format!(
                r"
                SELECT COALESCE(SUM(l.is_available), 0), AVG(l.eta_minutes)
                FROM driver_locations l
                WHERE {LATEST_POSITION_CLAUSE}
                  AND l.last_update >= ?1
                "
            ),
            [format_timestamp(cutoff)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        #[allow(clippy::cast_precision_loss)]
        let coverage = if total_drivers > 0 {
            available_drivers as f64 / total_drivers as f64 * 100.0
        } else {
            0.0
        };

        Ok(FleetStats {
            total_drivers,
            available_drivers,
            avg_eta_minutes: round_to_tenth(avg_eta.unwrap_or(DEFAULT_AVG_ETA_MINUTES)),
            coverage_percentage: round_to_tenth(coverage),
        })
    }

    /// Report how much data the store holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn data_status(&self) -> Result<DataStatus> {
        let drivers = self.count_drivers()?;
        let positions = self.count_positions()?;
        Ok(DataStatus {
            drivers,
            positions,
            has_data: drivers > 0,
        })
    }

    /// Delete every driver and position.
    ///
    /// Returns the number of profiles removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self) -> Result<usize> {
        self.conn.execute("DELETE FROM driver_locations", [])?;
        let removed = self.conn.execute("DELETE FROM drivers", [])?;
        info!("Cleared {} drivers", removed);
        Ok(removed)
    }

    /// Insert the fixed sample drivers used for manual testing.
    ///
    /// Returns the number of drivers written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn seed_samples(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let samples = sample_drivers(now);
        for record in &samples {
            self.write_driver(&record.profile, &record.position)?;
        }
        info!("Seeded {} sample drivers", samples.len());
        Ok(samples.len())
    }

    /// Store a metadata value, replacing any previous value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    /// Read a metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Convert the profile columns starting at `offset` into a profile.
    fn row_to_profile(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<DriverProfile> {
        let vehicle_type_str: String = row.get(offset + 2)?;
        let vehicle_type = vehicle_type_str.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown vehicle type: {}, defaulting to standard",
                vehicle_type_str
            );
            VehicleType::Standard
        });

        Ok(DriverProfile {
            driver_id: row.get(offset)?,
            name: row.get(offset + 1)?,
            vehicle_type,
            license_plate: row.get(offset + 3)?,
            rating: row.get(offset + 4)?,
            total_trips: row.get(offset + 5)?,
        })
    }

    /// Convert the position columns starting at `offset` into a position.
    fn row_to_position(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<DriverPosition> {
        let last_update_str: String = row.get(offset + 4)?;
        let last_update = parse_timestamp(&last_update_str).unwrap_or_else(|| {
            warn!("Unparseable position timestamp: {}", last_update_str);
            DateTime::<Utc>::MIN_UTC
        });

        Ok(DriverPosition {
            latitude: row.get(offset)?,
            longitude: row.get(offset + 1)?,
            is_available: row.get(offset + 2)?,
            eta_minutes: row.get(offset + 3)?,
            last_update,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DriverRecord> {
        Ok(DriverRecord {
            profile: Self::row_to_profile(row, 0)?,
            position: Self::row_to_position(row, 6)?,
        })
    }
}

impl DriverSink for Storage {
    fn upsert_profile(&mut self, profile: &DriverProfile) -> Result<()> {
        Storage::upsert_profile(self, profile)
    }

    fn append_position(&mut self, driver_id: &str, position: &DriverPosition) -> Result<()> {
        Storage::append_position(self, driver_id, position).map(|_| ())
    }

    fn write_driver(&mut self, profile: &DriverProfile, position: &DriverPosition) -> Result<()> {
        Storage::write_driver(self, profile, position).map(|_| ())
    }
}

fn insert_profile(conn: &Connection, profile: &DriverProfile) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO drivers (driver_id, name, vehicle_type, license_plate, rating, total_trips)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(driver_id) DO UPDATE SET
            name = excluded.name,
            vehicle_type = excluded.vehicle_type,
            license_plate = excluded.license_plate,
            rating = excluded.rating,
            total_trips = excluded.total_trips
        ",
        params![
            profile.driver_id,
            profile.name,
            profile.vehicle_type.as_str(),
            profile.license_plate,
            profile.rating,
            profile.total_trips,
        ],
    )?;
    debug!(driver_id = %profile.driver_id, "Upserted driver profile");
    Ok(())
}

fn insert_position(conn: &Connection, driver_id: &str, position: &DriverPosition) -> Result<i64> {
    conn.execute(
        r"
        INSERT INTO driver_locations
            (driver_id, latitude, longitude, is_available, eta_minutes, last_update)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            driver_id,
            position.latitude,
            position.longitude,
            position.is_available,
            position.eta_minutes,
            format_timestamp(position.last_update),
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!(driver_id, id, "Appended driver position");
    Ok(id)
}

/// Availability summary of the fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetStats {
    /// Number of stored driver profiles.
    pub total_drivers: i64,
    /// Drivers whose current position is recent and available.
    pub available_drivers: i64,
    /// Mean ETA over current positions, in minutes.
    pub avg_eta_minutes: f64,
    /// Share of drivers that are available, in percent.
    pub coverage_percentage: f64,
}

/// How much data the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataStatus {
    /// Number of driver profiles.
    pub drivers: i64,
    /// Number of position rows, including history.
    pub positions: i64,
    /// Whether any driver has been stored.
    pub has_data: bool,
}

/// Canonical timestamp form; fixed width so text order matches time order.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Profile columns of the sample drivers: id, name, vehicle type, plate, rating, trips.
const SAMPLE_PROFILES: [(&str, &str, VehicleType, &str, f64, u32); 3] = [
    ("DRV_TEST_001", "Test Driver One", VehicleType::Standard, "TEST001", 4.5, 25),
    ("DRV_TEST_002", "Test Driver Two", VehicleType::Premium, "TEST002", 4.8, 42),
    ("DRV_TEST_003", "Test Driver Three", VehicleType::Suv, "TEST003", 4.3, 18),
];

/// Position columns of the sample drivers: latitude, longitude, available, ETA.
const SAMPLE_POSITIONS: [(f64, f64, bool, u32); 3] = [
    (40.7128, -74.0060, true, 5),
    (40.7589, -73.9851, true, 3),
    (40.7282, -73.7949, false, 10),
];

fn sample_drivers(now: DateTime<Utc>) -> Vec<DriverRecord> {
    SAMPLE_PROFILES
        .iter()
        .zip(SAMPLE_POSITIONS)
        .map(
            |(&(id, name, vehicle_type, plate, rating, trips), (lat, lng, available, eta))| {
                DriverRecord {
                    profile: DriverProfile {
                        driver_id: id.to_string(),
                        name: name.to_string(),
                        vehicle_type,
                        license_plate: plate.to_string(),
                        rating,
                        total_trips: trips,
                    },
                    position: DriverPosition {
                        latitude: lat,
                        longitude: lng,
                        is_available: available,
                        eta_minutes: eta,
                        last_update: now,
                    },
                }
            },
        )
        .collect()
}
