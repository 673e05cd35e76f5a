//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::driver::VehicleType;

/// Process command arguments.
#[derive(Debug, Args)]
pub struct ProcessCommand {
    /// Trip feed to process (defaults to `pipeline.input_path`)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Seed for reproducible synthesis
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Nearby command arguments.
#[derive(Debug, Args)]
pub struct NearbyCommand {
    /// Latitude of the search center (defaults to `query.default_lat`)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the search center (defaults to `query.default_lng`)
    #[arg(long, allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Search radius in kilometres
    #[arg(short, long, allow_negative_numbers = true)]
    pub radius: Option<f64>,

    /// Only consider positions updated within this many minutes
    #[arg(short, long)]
    pub window_minutes: Option<u32>,

    /// Only return drivers with this vehicle type
    #[arg(short = 't', long, value_enum)]
    pub vehicle_type: Option<VehicleTypeArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Database commands.
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Delete all drivers and positions
    Reset {
        /// Insert the sample drivers after clearing
        #[arg(long)]
        with_samples: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Vehicle type argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VehicleTypeArg {
    /// Standard taxi
    Standard,
    /// Premium sedan
    Premium,
    /// SUV
    Suv,
    /// Accessible vehicle
    Accessible,
}

impl From<VehicleTypeArg> for VehicleType {
    fn from(arg: VehicleTypeArg) -> Self {
        match arg {
            VehicleTypeArg::Standard => Self::Standard,
            VehicleTypeArg::Premium => Self::Premium,
            VehicleTypeArg::Suv => Self::Suv,
            VehicleTypeArg::Accessible => Self::Accessible,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_arg_conversion() {
        assert_eq!(VehicleType::from(VehicleTypeArg::Standard), VehicleType::Standard);
        assert_eq!(VehicleType::from(VehicleTypeArg::Premium), VehicleType::Premium);
        assert_eq!(VehicleType::from(VehicleTypeArg::Suv), VehicleType::Suv);
        assert_eq!(VehicleType::from(VehicleTypeArg::Accessible), VehicleType::Accessible);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }
}
