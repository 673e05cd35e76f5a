//! Logging setup for `fleetctl` and the pipeline.
//!
//! Pipeline stages report their record counts and the store reports opens,
//! migrations and writes through `tracing`. Everything is written to stderr
//! so that `--json` output on stdout can be piped.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dependencies whose logs stay at `warn` below [`Verbosity::Trace`].
const CAPPED_DEPENDENCIES: &[&str] = &["rusqlite"];

/// How much the pipeline and store should log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Stage counts and run summaries.
    #[default]
    Normal,
    /// Per-driver writes and store queries.
    Verbose,
    /// Everything, including dependency logs.
    Trace,
}

impl Verbosity {
    /// Level applied to this crate's own targets.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Level applied to [`CAPPED_DEPENDENCIES`].
    fn dependency_level(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            other => other.level().min(LevelFilter::WARN),
        }
    }
}

/// Filter directives used when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> String {
    let mut directives = vec![directive("driverfleet", verbosity.level())];
    directives.extend(
        CAPPED_DEPENDENCIES
            .iter()
            .map(|target| directive(target, verbosity.dependency_level())),
    );
    directives.join(",")
}

fn directive(target: &str, level: LevelFilter) -> String {
    format!("{target}={}", level.to_string().to_ascii_lowercase())
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `verbosity` when set. Calling this twice is harmless;
/// the first subscriber stays installed.
///
/// # Examples
///
/// ```no_run
/// use driverfleet::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Route warnings to the test harness output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("driverfleet=warn")
        .with_test_writer()
        .try_init();
}
