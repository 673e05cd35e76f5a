//! Trip feed input.
//!
//! Reads raw trip records from a CSV file. Only the columns the pipeline needs
//! are decoded; anything else in the file is ignored. Coordinates may be blank,
//! in which case they come through as `None` and are dropped by the cleaner.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Header the configured origin-group column is mapped onto while decoding.
const ORIGIN_FIELD: &str = "origin_id";

/// Default name of the column that groups trips into drivers.
pub const DEFAULT_ORIGIN_COLUMN: &str = "vendor_id";

/// A single trip as it appears in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTripRecord {
    /// Pickup latitude in degrees.
    pub pickup_latitude: Option<f64>,
    /// Pickup longitude in degrees.
    pub pickup_longitude: Option<f64>,
    /// Dropoff latitude in degrees.
    pub dropoff_latitude: Option<f64>,
    /// Dropoff longitude in degrees.
    pub dropoff_longitude: Option<f64>,
    /// Trip duration in seconds.
    pub trip_duration: i64,
    /// Number of passengers.
    pub passenger_count: u32,
    /// Opaque origin-group identifier (e.g. the vendor).
    #[serde(rename = "origin_id")]
    pub origin: String,
}

impl RawTripRecord {
    /// Pickup point, if both axes are present.
    #[must_use]
    pub fn pickup(&self) -> Option<(f64, f64)> {
        Some((self.pickup_latitude?, self.pickup_longitude?))
    }

    /// Dropoff point, if both axes are present.
    #[must_use]
    pub fn dropoff(&self) -> Option<(f64, f64)> {
        Some((self.dropoff_latitude?, self.dropoff_longitude?))
    }
}

/// Read every trip record from the CSV file at `path`.
///
/// `origin_column` names the column used as the origin-group identifier.
///
/// # Errors
///
/// Returns [`Error::InputNotFound`] if the file cannot be opened, and
/// [`Error::Csv`] if a row cannot be decoded.
pub fn read_trip_records(
    path: impl AsRef<Path>,
    origin_column: &str,
) -> Result<Vec<RawTripRecord>> {
    let path = path.as_ref();
    debug!("Opening trip feed at {}", path.display());

    let file = File::open(path).map_err(|e| Error::InputNotFound {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let records = parse_trip_records(file, origin_column)?;
    info!(path = %path.display(), records = records.len(), "Loaded trip feed");
    Ok(records)
}

/// Decode trip records from any CSV source with a header row.
///
/// # Errors
///
/// Returns an error if the header lacks `origin_column` or a row cannot be
/// decoded.
pub fn parse_trip_records<R: Read>(reader: R, origin_column: &str) -> Result<Vec<RawTripRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = remap_origin_header(reader.headers()?, origin_column)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(row.deserialize(Some(&headers))?);
    }
    Ok(records)
}

/// Rename the origin-group column so it lines up with [`RawTripRecord::origin`].
fn remap_origin_header(headers: &StringRecord, origin_column: &str) -> Result<StringRecord> {
    if !headers.iter().any(|h| h == origin_column) {
        return Err(Error::ConfigValidation {
            message: format!("origin column '{origin_column}' not found in trip feed header"),
        });
    }

    Ok(headers
        .iter()
        .map(|h| if h == origin_column { ORIGIN_FIELD } else { h })
        .collect())
}
