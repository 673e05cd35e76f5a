//! Writing synthesized drivers to a store.

use tracing::{debug, info, warn};

use crate::driver::{DriverPosition, DriverProfile};
use crate::error::{Error, Result};
use crate::synthesis::SynthesizedDriver;

/// Write side of a driver store.
pub trait DriverSink {
    /// Insert a profile, replacing any existing profile with the same `driver_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn upsert_profile(&mut self, profile: &DriverProfile) -> Result<()>;

    /// Append a position for `driver_id`. Never replaces earlier positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn append_position(&mut self, driver_id: &str, position: &DriverPosition) -> Result<()>;

    /// Write a profile together with its position.
    ///
    /// Stores that support transactions override this so that a failed
    /// position append leaves the previous profile in place. The default
    /// issues the two writes in sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if either write is rejected.
    fn write_driver(&mut self, profile: &DriverProfile, position: &DriverPosition) -> Result<()> {
        self.upsert_profile(profile)?;
        self.append_position(&profile.driver_id, position)
    }
}

/// Write every driver's profile and position, in order.
///
/// Each driver goes through [`DriverSink::write_driver`]. Stops at the first
/// failure. Drivers written before the failure stay written; there is no
/// batch-wide rollback.
///
/// Returns the number of drivers written.
///
/// # Errors
///
/// Returns [`Error::StoreWrite`] carrying the number of drivers fully
/// written before the failing one.
pub fn persist_drivers<S: DriverSink + ?Sized>(
    sink: &mut S,
    drivers: &[SynthesizedDriver],
) -> Result<usize> {
    for (committed, driver) in drivers.iter().enumerate() {
        let driver_id = driver.profile.driver_id.as_str();

        sink.write_driver(&driver.profile, &driver.position).map_err(|e| {
            warn!(driver_id, committed, error = %e, "Persisting drivers aborted");
            Error::StoreWrite {
                committed,
                message: e.to_string(),
            }
        })?;

        debug!(driver_id, "Persisted driver");
    }

    info!("Persisted {} drivers", drivers.len());
    Ok(drivers.len())
}
