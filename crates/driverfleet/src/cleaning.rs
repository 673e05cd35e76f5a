//! Trip record cleaning.
//!
//! The cleaner narrows a raw feed down to trips that are plausible for the
//! configured area. Each stage runs over the output of the previous one:
//!
//! 1. drop trips with a missing coordinate,
//! 2. drop trips with a pickup or dropoff outside the bounding box,
//! 3. drop trips that are implausibly short or long,
//! 4. drop pickups that are statistical outliers on either axis.
//!
//! The outlier statistics are computed over the output of stage 3 only.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::CleaningConfig;
use crate::feed::RawTripRecord;

/// Number of records left after each cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Records received.
    pub input: usize,
    /// Records with all four coordinates present.
    pub with_coordinates: usize,
    /// Records whose pickup and dropoff lie inside the bounding box.
    pub within_bounds: usize,
    /// Records with a plausible trip duration.
    pub plausible_duration: usize,
    /// Records that survived outlier rejection.
    pub output: usize,
}

/// Cleaned records together with the stage counts.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningOutcome {
    /// Records that passed every stage, in input order.
    pub records: Vec<RawTripRecord>,
    /// Stage counts.
    pub report: CleaningReport,
}

/// Mean and sample standard deviation of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisStats {
    mean: f64,
    std_dev: f64,
}

impl AxisStats {
    /// Compute over `values`; `None` when fewer than two values exist.
    fn compute(values: impl Iterator<Item = f64> + Clone) -> Option<Self> {
        let n = values.clone().count();
        if n < 2 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = n as f64;
        let mean = values.clone().sum::<f64>() / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    fn within(&self, value: f64, sigma: f64) -> bool {
        let spread = sigma * self.std_dev;
        (self.mean - spread..=self.mean + spread).contains(&value)
    }
}

/// Filters raw trip records down to a plausible subset.
#[derive(Debug, Clone)]
pub struct RecordCleaner {
    config: CleaningConfig,
}

impl Default for RecordCleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl RecordCleaner {
    /// Create a cleaner with the given thresholds.
    #[must_use]
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Run every cleaning stage over `records`.
    #[must_use]
    pub fn clean(&self, records: Vec<RawTripRecord>) -> CleaningOutcome {
        let mut report = CleaningReport {
            input: records.len(),
            ..CleaningReport::default()
        };

        let records: Vec<_> = records.into_iter().filter(has_coordinates).collect();
        report.with_coordinates = records.len();

        let records: Vec<_> = records
            .into_iter()
            .filter(|r| self.within_bounds(r))
            .collect();
        report.within_bounds = records.len();

        let records: Vec<_> = records
            .into_iter()
            .filter(|r| self.plausible_duration(r))
            .collect();
        report.plausible_duration = records.len();

        let records = self.reject_outliers(records);
        report.output = records.len();

        info!(
            input = report.input,
            with_coordinates = report.with_coordinates,
            within_bounds = report.within_bounds,
            plausible_duration = report.plausible_duration,
            output = report.output,
            "Data cleaning: {} -> {} records",
            report.input,
            report.output
        );

        CleaningOutcome { records, report }
    }

    fn within_bounds(&self, record: &RawTripRecord) -> bool {
        let bounds = &self.config.bounds;
        match (record.pickup(), record.dropoff()) {
            (Some((plat, plng)), Some((dlat, dlng))) => {
                bounds.contains(plat, plng) && bounds.contains(dlat, dlng)
            }
            _ => false,
        }
    }

    fn plausible_duration(&self, record: &RawTripRecord) -> bool {
        record.trip_duration > self.config.min_duration_secs
            && record.trip_duration < self.config.max_duration_secs
    }

    fn reject_outliers(&self, records: Vec<RawTripRecord>) -> Vec<RawTripRecord> {
        let lat = AxisStats::compute(records.iter().filter_map(|r| r.pickup_latitude));
        let lng = AxisStats::compute(records.iter().filter_map(|r| r.pickup_longitude));

        // Fewer than two records leaves the deviation undefined; nothing passes
        let (Some(lat), Some(lng)) = (lat, lng) else {
            debug!(records = records.len(), "Too few records for outlier statistics");
            return Vec::new();
        };

        debug!(
            lat_mean = lat.mean,
            lat_std = lat.std_dev,
            lng_mean = lng.mean,
            lng_std = lng.std_dev,
            "Pickup statistics"
        );

        let sigma = self.config.outlier_sigma;
        records
            .into_iter()
            .filter(|r| match r.pickup() {
                Some((plat, plng)) => lat.within(plat, sigma) && lng.within(plng, sigma),
                None => false,
            })
            .collect()
    }
}

fn has_coordinates(record: &RawTripRecord) -> bool {
    [
        record.pickup_latitude,
        record.pickup_longitude,
        record.dropoff_latitude,
        record.dropoff_longitude,
    ]
    .iter()
    .all(|c| c.is_some_and(f64::is_finite))
}
