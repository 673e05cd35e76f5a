//! `SQLite` schema definitions for driverfleet.
//!
//! Profiles live in `drivers`, keyed by `driver_id`. Positions are appended to
//! `driver_locations` and never updated, so the table doubles as a history.

/// SQL statement to create the drivers table.
pub const CREATE_DRIVERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS drivers (
    driver_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    vehicle_type TEXT NOT NULL,
    license_plate TEXT NOT NULL,
    rating REAL NOT NULL,
    total_trips INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the append-only driver positions table.
pub const CREATE_LOCATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS driver_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_id TEXT NOT NULL REFERENCES drivers (driver_id),
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    is_available INTEGER NOT NULL DEFAULT 1,
    eta_minutes INTEGER NOT NULL DEFAULT 5,
    last_update TEXT NOT NULL
)
";

/// Index used to find the latest position of each driver.
pub const CREATE_LOCATIONS_DRIVER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_locations_driver ON driver_locations(driver_id, last_update DESC)
";

/// Index used by availability statistics.
pub const CREATE_LOCATIONS_AVAILABILITY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_locations_availability ON driver_locations(is_available, last_update)
";

/// Index on `vehicle_type` for filtered queries.
pub const CREATE_VEHICLE_TYPE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_drivers_vehicle_type ON drivers(vehicle_type)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DRIVERS_TABLE,
    CREATE_LOCATIONS_TABLE,
    CREATE_LOCATIONS_DRIVER_INDEX,
    CREATE_LOCATIONS_AVAILABILITY_INDEX,
    CREATE_VEHICLE_TYPE_INDEX,
    CREATE_METADATA_TABLE,
];
