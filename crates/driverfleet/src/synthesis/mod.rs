//! Driver profile synthesis.
//!
//! Cleaned trips are grouped by their origin-group identifier and each
//! sufficiently large group becomes one driver. The group's trip statistics
//! decide the vehicle class and ETA; everything cosmetic (name, rating
//! jitter, position, availability) is drawn from the caller's random source.
//!
//! Groups are processed in ascending identifier order, and every profile
//! consumes its random draws in the same order, so a seeded
//! [`rand::rngs::StdRng`] reproduces a run exactly.

pub mod catalog;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::driver::{driver_id_for, license_plate_for, DriverPosition, DriverProfile, VehicleType};
use crate::feed::RawTripRecord;
use crate::geo::haversine_km;

use catalog::{Neighborhood, FIRST_NAMES, LAST_NAMES, NEIGHBORHOODS};

/// Average trip distance assumed for a group with no measurable trips.
const FALLBACK_TRIP_DISTANCE_KM: f64 = 2.0;

/// Maximum jitter applied to each axis of a neighborhood centroid, in degrees.
const POSITION_JITTER_DEG: f64 = 0.005;

/// Maximum jitter applied to the experience-based rating.
const RATING_JITTER: f64 = 0.2;

/// Rating bounds.
const MIN_RATING: f64 = 3.5;
const MAX_RATING: f64 = 5.0;

/// ETA bounds in minutes.
const MIN_ETA_MINUTES: u32 = 2;
const MAX_ETA_MINUTES: u32 = 15;

/// Most profiles a single run may create.
pub const MAX_PROFILES: usize = 100;

/// Fewest trips a group needs before it becomes a driver.
pub const MIN_GROUP_SIZE: usize = 5;

/// Synthesis parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Hard cap on profiles created per run.
    pub max_profiles: usize,
    /// Groups with fewer records than this are skipped.
    pub min_group_size: usize,
    /// Chance that an otherwise standard vehicle is accessible.
    pub accessible_probability: f64,
    /// Chance that a driver is available.
    pub availability_probability: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for SynthesisConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_profiles: config.max_profiles,
            min_group_size: config.min_group_size,
            accessible_probability: config.accessible_probability,
            availability_probability: config.availability_probability,
        }
    }
}

/// Trip statistics for one origin group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Number of trips in the group.
    pub size: usize,
    /// Mean passenger count.
    pub avg_passengers: f64,
    /// Mean trip duration in seconds.
    pub avg_duration_secs: f64,
    /// Mean pickup-to-dropoff distance in kilometres.
    pub avg_distance_km: f64,
}

impl GroupSummary {
    /// Summarize a non-empty group of trips.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_trips(trips: &[&RawTripRecord]) -> Self {
        let size = trips.len();
        let n = size.max(1) as f64;

        let avg_passengers = trips.iter().map(|t| f64::from(t.passenger_count)).sum::<f64>() / n;
        let avg_duration_secs = trips.iter().map(|t| t.trip_duration as f64).sum::<f64>() / n;

        let distances: Vec<f64> = trips
            .iter()
            .filter_map(|t| {
                let (plat, plng) = t.pickup()?;
                let (dlat, dlng) = t.dropoff()?;
                Some(haversine_km(plat, plng, dlat, dlng))
            })
            .collect();
        let avg_distance_km = if distances.is_empty() {
            FALLBACK_TRIP_DISTANCE_KM
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };

        Self {
            size,
            avg_passengers,
            avg_duration_secs,
            avg_distance_km,
        }
    }

    /// Vehicle class implied by the trip statistics alone.
    ///
    /// Returns `None` when the statistics are inconclusive and the class has
    /// to be drawn at random.
    #[must_use]
    pub fn implied_vehicle_type(&self) -> Option<VehicleType> {
        if self.avg_passengers > 3.0 {
            Some(VehicleType::Suv)
        } else if self.avg_duration_secs > 1800.0 || self.avg_distance_km > 10.0 {
            Some(VehicleType::Premium)
        } else if (self.avg_passengers - 1.0).abs() < f64::EPSILON
            && self.avg_duration_secs < 600.0
        {
            Some(VehicleType::Standard)
        } else {
            None
        }
    }

    /// Estimated minutes to pickup derived from the mean trip duration.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn eta_minutes(&self) -> u32 {
        let minutes = (self.avg_duration_secs / 60.0).round();
        minutes.clamp(f64::from(MIN_ETA_MINUTES), f64::from(MAX_ETA_MINUTES)) as u32
    }

    /// Rating before jitter: 4.0 plus up to one point for experience.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn base_rating(&self) -> f64 {
        4.0 + (self.size as f64 / 1000.0).min(1.0)
    }
}

/// A synthesized driver and where they were placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedDriver {
    /// The driver's profile.
    pub profile: DriverProfile,
    /// The driver's initial position.
    pub position: DriverPosition,
    /// Neighborhood the position was drawn around.
    pub neighborhood: &'static str,
}

/// Turns cleaned trip records into driver profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileSynthesizer {
    config: SynthesisConfig,
}

impl ProfileSynthesizer {
    /// Create a synthesizer with the given parameters.
    ///
    /// `max_profiles` is capped at [`MAX_PROFILES`] and `min_group_size` is
    /// raised to at least [`MIN_GROUP_SIZE`].
    #[must_use]
    pub fn new(mut config: SynthesisConfig) -> Self {
        config.max_profiles = config.max_profiles.min(MAX_PROFILES);
        config.min_group_size = config.min_group_size.max(MIN_GROUP_SIZE);
        Self { config }
    }

    /// Synthesize one driver per qualifying origin group.
    ///
    /// Positions are stamped with `now`. At most `max_profiles` drivers are
    /// returned; groups beyond the cap are ignored.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        records: &[RawTripRecord],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<SynthesizedDriver> {
        let mut groups: BTreeMap<&str, Vec<&RawTripRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.origin.as_str()).or_default().push(record);
        }
        debug!(groups = groups.len(), "Grouped trips by origin");

        let mut drivers = Vec::new();
        for (origin, trips) in &groups {
            if drivers.len() >= self.config.max_profiles {
                debug!(cap = self.config.max_profiles, "Profile cap reached");
                break;
            }
            if trips.len() < self.config.min_group_size {
                debug!(origin, trips = trips.len(), "Skipping small group");
                continue;
            }

            let summary = GroupSummary::from_trips(trips);
            let driver = self.synthesize_driver(drivers.len() + 1, &summary, rng, now);
            debug!(
                origin,
                driver_id = %driver.profile.driver_id,
                vehicle_type = %driver.profile.vehicle_type,
                trips = summary.size,
                "Synthesized driver"
            );
            drivers.push(driver);
        }

        info!("Created {} driver profiles from {} trips", drivers.len(), records.len());
        drivers
    }

    /// Build the driver for the `sequence`-th qualifying group.
    fn synthesize_driver<R: Rng + ?Sized>(
        &self,
        sequence: usize,
        summary: &GroupSummary,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> SynthesizedDriver {
        let first = pick(FIRST_NAMES, rng);
        let last = pick(LAST_NAMES, rng);

        let vehicle_type = summary.implied_vehicle_type().unwrap_or_else(|| {
            if rng.gen::<f64>() < self.config.accessible_probability {
                VehicleType::Accessible
            } else {
                VehicleType::Standard
            }
        });

        let jitter = rng.gen_range(-RATING_JITTER..=RATING_JITTER);
        let rating = round_to_tenth(summary.base_rating() + jitter).clamp(MIN_RATING, MAX_RATING);

        let neighborhood: &Neighborhood = pick(NEIGHBORHOODS, rng);
        let latitude =
            neighborhood.latitude + rng.gen_range(-POSITION_JITTER_DEG..=POSITION_JITTER_DEG);
        let longitude =
            neighborhood.longitude + rng.gen_range(-POSITION_JITTER_DEG..=POSITION_JITTER_DEG);

        let is_available = rng.gen::<f64>() < self.config.availability_probability;

        SynthesizedDriver {
            profile: DriverProfile {
                driver_id: driver_id_for(sequence),
                name: format!("{first} {last}"),
                vehicle_type,
                license_plate: license_plate_for(sequence),
                rating,
                total_trips: u32::try_from(summary.size).unwrap_or(u32::MAX),
            },
            position: DriverPosition {
                latitude,
                longitude,
                is_available,
                eta_minutes: summary.eta_minutes(),
                last_update: now,
            },
            neighborhood: neighborhood.name,
        }
    }
}

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
