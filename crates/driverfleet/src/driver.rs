//! Driver domain types.
//!
//! A driver is split into a slowly changing [`DriverProfile`] and a
//! [`DriverPosition`] that is stored separately so it can be refreshed on its
//! own. The store keeps every position ever appended; the current one is the
//! row with the latest `last_update`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Class of vehicle a driver operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    /// Regular taxi.
    Standard,
    /// Sedan for long trips.
    Premium,
    /// Large vehicle for groups.
    Suv,
    /// Wheelchair accessible vehicle.
    Accessible,
}

impl VehicleType {
    /// All vehicle types, in declaration order.
    pub const ALL: [VehicleType; 4] = [
        VehicleType::Standard,
        VehicleType::Premium,
        VehicleType::Suv,
        VehicleType::Accessible,
    ];

    /// The identifier stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Suv => "suv",
            Self::Accessible => "accessible",
        }
    }

    /// Human-readable vehicle name shown to riders.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Standard => "Standard Taxi",
            Self::Premium => "Premium Sedan",
            Self::Suv => "SUV",
            Self::Accessible => "Accessible Vehicle",
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|vt| vt.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("unknown vehicle type: {s}")))
    }
}

/// A synthesized driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Stable identifier, e.g. `DRV_001`.
    pub driver_id: String,
    /// Display name.
    pub name: String,
    /// Vehicle class.
    pub vehicle_type: VehicleType,
    /// Licence plate, unique per profile.
    pub license_plate: String,
    /// Rating within [3.5, 5.0].
    pub rating: f64,
    /// Number of trips in the originating record group.
    pub total_trips: u32,
}

/// Where a driver is and whether they can take a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverPosition {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Whether the driver is accepting rides.
    pub is_available: bool,
    /// Estimated minutes to pickup, within [2, 15].
    pub eta_minutes: u32,
    /// When this position was recorded.
    pub last_update: DateTime<Utc>,
}

impl DriverPosition {
    /// Availability as the status label used in reports.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.is_available {
            "available"
        } else {
            "unavailable"
        }
    }
}

/// A profile joined with its current position, as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    /// The driver's profile.
    pub profile: DriverProfile,
    /// The driver's most recent position.
    pub position: DriverPosition,
}

/// Format the dense driver identifier for a 1-based sequence number.
#[must_use]
pub fn driver_id_for(sequence: usize) -> String {
    format!("DRV_{sequence:03}")
}

/// Format the licence plate for a 1-based sequence number.
#[must_use]
pub fn license_plate_for(sequence: usize) -> String {
    format!("T{}", 40_000 + sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_display() {
        assert_eq!(VehicleType::Standard.to_string(), "standard");
        assert_eq!(VehicleType::Premium.to_string(), "premium");
        assert_eq!(VehicleType::Suv.to_string(), "suv");
        assert_eq!(VehicleType::Accessible.to_string(), "accessible");
    }

    #[test]
    fn test_vehicle_type_parse() {
        for vt in VehicleType::ALL {
            assert_eq!(vt.as_str().parse::<VehicleType>().unwrap(), vt);
        }
        assert_eq!("SUV".parse::<VehicleType>().unwrap(), VehicleType::Suv);
    }

    #[test]
    fn test_vehicle_type_parse_unknown() {
        let err = "limo".parse::<VehicleType>().unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("limo"));
    }

    #[test]
    fn test_vehicle_display_names() {
        assert_eq!(VehicleType::Standard.display_name(), "Standard Taxi");
        assert_eq!(VehicleType::Premium.display_name(), "Premium Sedan");
        assert_eq!(VehicleType::Suv.display_name(), "SUV");
        assert_eq!(VehicleType::Accessible.display_name(), "Accessible Vehicle");
    }

    #[test]
    fn test_vehicle_type_serde() {
        let json = serde_json::to_string(&VehicleType::Accessible).unwrap();
        assert_eq!(json, "\"accessible\"");
        let parsed: VehicleType = serde_json::from_str("\"suv\"").unwrap();
        assert_eq!(parsed, VehicleType::Suv);
    }

    #[test]
    fn test_driver_id_is_zero_padded() {
        assert_eq!(driver_id_for(1), "DRV_001");
        assert_eq!(driver_id_for(42), "DRV_042");
        assert_eq!(driver_id_for(100), "DRV_100");
    }

    #[test]
    fn test_license_plate() {
        assert_eq!(license_plate_for(1), "T40001");
        assert_eq!(license_plate_for(100), "T40100");
    }

    #[test]
    fn test_position_status() {
        let mut position = DriverPosition {
            latitude: 40.7,
            longitude: -74.0,
            is_available: true,
            eta_minutes: 5,
            last_update: Utc::now(),
        };
        assert_eq!(position.status(), "available");
        position.is_available = false;
        assert_eq!(position.status(), "unavailable");
    }
}
