//! Configuration management for driverfleet.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feed::DEFAULT_ORIGIN_COLUMN;
use crate::synthesis::{MAX_PROFILES, MIN_GROUP_SIZE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "driverfleet";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "nyc_taxi.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DRIVERFLEET_`, sections split on `__`)
/// 2. TOML config file at `~/.config/driverfleet/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Batch pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Record cleaning configuration.
    pub cleaning: CleaningConfig,
    /// Nearby-driver query defaults.
    pub query: QueryConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/driverfleet/nyc_taxi.db`
    pub database_path: Option<PathBuf>,
}

/// Batch pipeline and driver synthesis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trip feed to process when none is given on the command line.
    pub input_path: PathBuf,
    /// Column of the feed that groups trips into one driver.
    pub origin_column: String,
    /// Hard cap on profiles created per run.
    pub max_profiles: usize,
    /// Groups with fewer records than this are skipped.
    pub min_group_size: usize,
    /// Chance that an otherwise standard vehicle is accessible.
    pub accessible_probability: f64,
    /// Chance that a synthesized driver is available.
    pub availability_probability: f64,
    /// Seed for the random source; entropy is used when unset.
    pub seed: Option<u64>,
}

/// Latitude/longitude box, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

/// Record cleaning thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Area every pickup and dropoff must fall inside.
    pub bounds: BoundingBox,
    /// Trips at or below this many seconds are dropped.
    pub min_duration_secs: i64,
    /// Trips at or above this many seconds are dropped.
    pub max_duration_secs: i64,
    /// Pickups further than this many standard deviations from the mean are dropped.
    pub outlier_sigma: f64,
}

/// Defaults for nearby-driver queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Default search center latitude.
    pub default_lat: f64,
    /// Default search center longitude.
    pub default_lng: f64,
    /// Default search radius in kilometres.
    pub radius_km: f64,
    /// Positions older than this are not considered current.
    pub recency_minutes: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("train.csv"),
            origin_column: DEFAULT_ORIGIN_COLUMN.to_string(),
            max_profiles: MAX_PROFILES,
            min_group_size: MIN_GROUP_SIZE,
            accessible_probability: 0.10,
            availability_probability: 0.75,
            seed: None,
        }
    }
}

impl Default for BoundingBox {
    // NYC metro area
    fn default() -> Self {
        Self {
            min_lat: 40.50,
            max_lat: 41.00,
            min_lng: -74.30,
            max_lng: -73.70,
        }
    }
}

impl BoundingBox {
    /// Check whether a point lies inside the box.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::default(),
            min_duration_secs: 60,
            max_duration_secs: 10_800, // 3 hours
            outlier_sigma: 3.0,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_lat: 40.7128,
            default_lng: -74.0060,
            radius_km: 5.0,
            recency_minutes: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("DRIVERFLEET_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::ConfigValidation { message });

        let bounds = &self.cleaning.bounds;
        if bounds.min_lat > bounds.max_lat || bounds.min_lng > bounds.max_lng {
            return invalid(format!(
                "cleaning bounds are inverted: lat [{}, {}], lng [{}, {}]",
                bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
            ));
        }

        if self.cleaning.min_duration_secs >= self.cleaning.max_duration_secs {
            return invalid(format!(
                "min_duration_secs ({}) must be less than max_duration_secs ({})",
                self.cleaning.min_duration_secs, self.cleaning.max_duration_secs
            ));
        }

        if !(self.cleaning.outlier_sigma.is_finite() && self.cleaning.outlier_sigma > 0.0) {
            return invalid("outlier_sigma must be a positive number".to_string());
        }

        if !(1..=MAX_PROFILES).contains(&self.pipeline.max_profiles) {
            return invalid(format!(
                "max_profiles must be within [1, {MAX_PROFILES}], got {}",
                self.pipeline.max_profiles
            ));
        }

        if self.pipeline.min_group_size < MIN_GROUP_SIZE {
            return invalid(format!(
                "min_group_size must be at least {MIN_GROUP_SIZE}, got {}",
                self.pipeline.min_group_size
            ));
        }

        if self.pipeline.origin_column.trim().is_empty() {
            return invalid("origin_column must not be empty".to_string());
        }

        for (name, p) in [
            ("accessible_probability", self.pipeline.accessible_probability),
            ("availability_probability", self.pipeline.availability_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be within [0, 1], got {p}"));
            }
        }

        if !(self.query.radius_km.is_finite() && self.query.radius_km >= 0.0) {
            return invalid("radius_km must not be negative".to_string());
        }

        if self.query.recency_minutes == 0 {
            return invalid("recency_minutes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the query recency window.
    #[must_use]
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.query.recency_minutes))
    }
}
