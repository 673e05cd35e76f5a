//! The batch pipeline: read, clean, synthesize, persist.
//!
//! Runs are serialized process-wide. Each completed run leaves a
//! [`PipelineSummary`] in the store's metadata table so that later
//! invocations can report what the data was built from.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cleaning::RecordCleaner;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::parse_trip_records;
use crate::persist::persist_drivers;
use crate::storage::Storage;
use crate::synthesis::{ProfileSynthesizer, SynthesisConfig};

/// Metadata key holding the latest run summary.
pub const LAST_RUN_KEY: &str = "last_pipeline_run";

/// Guards against overlapping runs within one process.
static RUN_LOCK: Mutex<()> = Mutex::new(());

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Feed the run read from.
    pub input_path: PathBuf,
    /// Records read from the feed.
    pub records_in: usize,
    /// Records that survived cleaning.
    pub records_after_cleaning: usize,
    /// Driver profiles written.
    pub profiles_created: usize,
    /// BLAKE3 digest of the feed contents, hex encoded.
    pub input_digest: String,
    /// Seed of the random source, if one was fixed.
    pub seed: Option<u64>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

/// Runs the full pipeline with one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process the feed at `input` into `storage`.
    ///
    /// Uses `pipeline.seed` from the configuration when set and entropy
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] or [`Error::Csv`] if the feed cannot be
    /// read (nothing is written), and [`Error::StoreWrite`] if persisting fails
    /// part way.
    pub fn run(&self, input: &Path, storage: &mut Storage) -> Result<PipelineSummary> {
        let seed = self.config.pipeline.seed;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut summary = self.run_with_rng(input, storage, &mut rng, Utc::now())?;
        summary.seed = seed;

        // Drivers are already persisted at this point
        if let Err(e) = record_summary(storage, &summary) {
            warn!(error = %e, "Failed to record pipeline summary");
        }
        Ok(summary)
    }

    /// Process the feed with a caller-supplied random source and clock.
    ///
    /// Does not record the summary in the store.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        input: &Path,
        storage: &mut Storage,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<PipelineSummary> {
        let _guard = RUN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        info!("Starting pipeline run on {}", input.display());

        let contents = std::fs::read(input).map_err(|e| Error::InputNotFound {
            path: input.to_path_buf(),
            message: e.to_string(),
        })?;
        let input_digest = blake3::hash(&contents).to_hex().to_string();

        let records = parse_trip_records(contents.as_slice(), &self.config.pipeline.origin_column)?;
        let records_in = records.len();

        let cleaned = RecordCleaner::new(self.config.cleaning.clone()).clean(records);

        let synthesizer = ProfileSynthesizer::new(SynthesisConfig::from(&self.config.pipeline));
        let drivers = synthesizer.synthesize(&cleaned.records, rng, now);

        let profiles_created = persist_drivers(storage, &drivers)?;

        let summary = PipelineSummary {
            input_path: input.to_path_buf(),
            records_in,
            records_after_cleaning: cleaned.report.output,
            profiles_created,
            input_digest,
            seed: None,
            completed_at: Utc::now(),
        };

        info!(
            records_in,
            records_after_cleaning = summary.records_after_cleaning,
            profiles_created,
            "Pipeline run complete"
        );
        Ok(summary)
    }
}

/// Store `summary` as the latest run.
///
/// # Errors
///
/// Returns an error if serialization or the metadata write fails.
pub fn record_summary(storage: &Storage, summary: &PipelineSummary) -> Result<()> {
    storage.set_metadata(LAST_RUN_KEY, &serde_json::to_string(summary)?)
}

/// Read the latest run summary, if any run has been recorded.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or decoded.
pub fn last_summary(storage: &Storage) -> Result<Option<PipelineSummary>> {
    storage
        .metadata(LAST_RUN_KEY)?
        .map(|json| serde_json::from_str(&json).map_err(Error::from))
        .transpose()
}
