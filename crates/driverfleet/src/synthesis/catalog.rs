//! Fixed lists the synthesizer draws cosmetic attributes from.

/// A named reference point drivers are placed around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighborhood {
    /// Display name.
    pub name: &'static str,
    /// Centroid latitude in degrees.
    pub latitude: f64,
    /// Centroid longitude in degrees.
    pub longitude: f64,
}

/// First names for synthesized drivers.
pub const FIRST_NAMES: &[&str] = &[
    "Michael", "Sarah", "David", "James", "Lisa", "Robert", "Jennifer", "Christopher", "Maria",
    "William", "Linda", "Richard", "Daniel", "Susan", "Joseph", "Jessica", "Thomas", "Karen",
    "Charles", "Nancy",
];

/// Last names for synthesized drivers.
pub const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin",
];

/// NYC neighborhood centroids.
pub const NEIGHBORHOODS: &[Neighborhood] = &[
    Neighborhood { name: "Financial District", latitude: 40.7075, longitude: -74.0113 },
    Neighborhood { name: "Midtown", latitude: 40.7549, longitude: -73.9840 },
    Neighborhood { name: "Upper East Side", latitude: 40.7736, longitude: -73.9566 },
    Neighborhood { name: "Upper West Side", latitude: 40.7870, longitude: -73.9754 },
    Neighborhood { name: "Chelsea", latitude: 40.7465, longitude: -74.0014 },
    Neighborhood { name: "Greenwich Village", latitude: 40.7336, longitude: -74.0027 },
    Neighborhood { name: "SoHo", latitude: 40.7233, longitude: -74.0030 },
    Neighborhood { name: "Williamsburg", latitude: 40.7081, longitude: -73.9571 },
    Neighborhood { name: "Astoria", latitude: 40.7644, longitude: -73.9235 },
    Neighborhood { name: "Harlem", latitude: 40.8116, longitude: -73.9465 },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundingBox;

    #[test]
    fn test_name_lists_are_populated() {
        assert_eq!(FIRST_NAMES.len(), 20);
        assert_eq!(LAST_NAMES.len(), 20);
    }

    #[test]
    fn test_neighborhoods_are_inside_service_area() {
        assert!(NEIGHBORHOODS.len() >= 8);
        let bounds = BoundingBox::default();
        for n in NEIGHBORHOODS {
            assert!(bounds.contains(n.latitude, n.longitude), "{} is outside", n.name);
        }
    }
}
