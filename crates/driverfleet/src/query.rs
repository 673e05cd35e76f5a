//! Nearby driver queries.
//!
//! A query selects current positions that are recent enough, match an optional
//! vehicle class and lie within a radius of a center point. Parameters are
//! validated before the store is consulted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::QueryConfig;
use crate::driver::{DriverRecord, VehicleType};
use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::storage::Storage;

/// Parameters of a nearby-driver query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    /// Search center.
    pub center: Coordinate,
    /// Search radius in kilometres.
    pub radius_km: f64,
    /// How far back a position may be and still count as current.
    pub window: Duration,
    /// Restrict results to one vehicle class.
    pub vehicle_type: Option<VehicleType>,
}

impl NearbyQuery {
    /// Build a validated query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the center is not a valid coordinate,
    /// the radius is negative or not finite, or the window is not positive.
    pub fn new(
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        window: Duration,
        vehicle_type: Option<VehicleType>,
    ) -> Result<Self> {
        let query = Self {
            center: Coordinate::new(latitude, longitude)?,
            radius_km,
            window,
            vehicle_type,
        };
        query.validate()?;
        Ok(query)
    }

    /// Query around the configured default center with the configured radius and window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the configured values are invalid.
    pub fn from_config(config: &QueryConfig) -> Result<Self> {
        Self::new(
            config.default_lat,
            config.default_lng,
            config.radius_km,
            Duration::minutes(i64::from(config.recency_minutes)),
            None,
        )
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first rejected parameter.
    pub fn validate(&self) -> Result<()> {
        Coordinate::new(self.center.latitude, self.center.longitude)?;
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(Error::validation(format!(
                "radius must be a non-negative number of kilometres, got {}",
                self.radius_km
            )));
        }
        if self.window <= Duration::zero() {
            return Err(Error::validation(format!(
                "recency window must be positive, got {} minutes",
                self.window.num_minutes()
            )));
        }
        Ok(())
    }

    /// Oldest `last_update` still considered current at `now`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }
}

/// A current driver within range of the query center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyDriver {
    /// Profile and current position.
    #[serde(flatten)]
    pub record: DriverRecord,
    /// Distance to the query center in kilometres, rounded to two decimals.
    pub distance_km: f64,
}

impl NearbyDriver {
    /// Driver identifier.
    #[must_use]
    pub fn driver_id(&self) -> &str {
        &self.record.profile.driver_id
    }
}

/// Keep the candidates that satisfy `query` at time `now`.
///
/// Results are ordered by `last_update` descending, then `driver_id`.
#[must_use]
pub fn filter_nearby(
    candidates: Vec<DriverRecord>,
    query: &NearbyQuery,
    now: DateTime<Utc>,
) -> Vec<NearbyDriver> {
    let cutoff = query.cutoff(now);

    let mut nearby: Vec<NearbyDriver> = candidates
        .into_iter()
        .filter(|r| r.position.last_update >= cutoff)
        .filter(|r| {
            query
                .vehicle_type
                .map_or(true, |vt| r.profile.vehicle_type == vt)
        })
        .filter_map(|record| {
            let here = Coordinate {
                latitude: record.position.latitude,
                longitude: record.position.longitude,
            };
            let distance = query.center.distance_km(&here);
            (distance <= query.radius_km).then(|| NearbyDriver {
                record,
                distance_km: round_to_hundredth(distance),
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        b.record
            .position
            .last_update
            .cmp(&a.record.position.last_update)
            .then_with(|| a.driver_id().cmp(b.driver_id()))
    });

    debug!(
        radius_km = query.radius_km,
        matches = nearby.len(),
        "Filtered nearby drivers"
    );
    nearby
}

/// Load current drivers from `store` and keep those that satisfy `query`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for invalid parameters (the store is not
/// touched) or [`Error::StoreRead`] if the store cannot be read.
pub fn find_nearby(
    store: &Storage,
    query: &NearbyQuery,
    now: DateTime<Utc>,
) -> Result<Vec<NearbyDriver>> {
    query.validate()?;

    let candidates = store
        .current_drivers(query.cutoff(now), query.vehicle_type)
        .map_err(Error::into_store_read)?;

    Ok(filter_nearby(candidates, query, now))
}

fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
