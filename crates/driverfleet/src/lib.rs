//! `driverfleet` - Synthesize taxi driver profiles from trip records
//!
//! This library cleans a feed of raw taxi trips, derives one driver profile
//! per sufficiently large origin group, persists profiles and positions in
//! `SQLite`, and finds current drivers near a location.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cleaning;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod feed;
pub mod geo;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod storage;
pub mod synthesis;

pub use cleaning::{CleaningReport, RecordCleaner};
pub use config::Config;
pub use driver::{DriverPosition, DriverProfile, DriverRecord, VehicleType};
pub use error::{Error, Result};
pub use geo::{haversine_km, Coordinate};
pub use logging::init_logging;
pub use persist::{persist_drivers, DriverSink};
pub use pipeline::{Pipeline, PipelineSummary};
pub use query::{filter_nearby, find_nearby, NearbyDriver, NearbyQuery};
pub use storage::{DataStatus, FleetStats, Storage};
pub use synthesis::{ProfileSynthesizer, SynthesizedDriver};
