//! Command-line interface for driverfleet.
//!
//! This module provides the CLI structure for the `fleetctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DbCommand, NearbyCommand, OutputFormat, ProcessCommand, StatsCommand,
    StatusCommand, VehicleTypeArg,
};

/// fleetctl - Synthesize taxi drivers from trip records and find them by location
///
/// Cleans a trip feed, turns each large enough origin group into a driver
/// profile with a position, and answers nearby-driver queries against the
/// stored positions.
#[derive(Debug, Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean a trip feed and synthesize drivers from it
    Process(ProcessCommand),

    /// Find current drivers near a location
    Nearby(NearbyCommand),

    /// Show fleet availability statistics
    Stats(StatsCommand),

    /// Show what the database holds
    Status(StatusCommand),

    /// Manage the driver database
    #[command(subcommand)]
    Db(DbCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Whether the command asked for JSON output.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        match self {
            Self::Process(cmd) => cmd.json,
            Self::Nearby(cmd) => cmd.format == OutputFormat::Json,
            Self::Stats(cmd) => cmd.json,
            Self::Status(cmd) => cmd.json,
            Self::Config(ConfigCommand::Show { json }) => *json,
            Self::Db(_) | Self::Config(_) => false,
        }
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fleetctl");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process() {
        let args = vec!["fleetctl", "process", "--input", "trips.csv", "--seed", "42", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Process(cmd) => {
                assert_eq!(cmd.input, Some(PathBuf::from("trips.csv")));
                assert_eq!(cmd.seed, Some(42));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_nearby_negative_longitude() {
        let args = vec![
            "fleetctl", "nearby", "--lat", "40.7128", "--lng", "-74.0060", "--radius", "2.5",
            "--vehicle-type", "suv", "--format", "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.command.wants_json());
        match cli.command {
            Command::Nearby(cmd) => {
                assert_eq!(cmd.lat, Some(40.7128));
                assert_eq!(cmd.lng, Some(-74.0060));
                assert_eq!(cmd.radius, Some(2.5));
                assert_eq!(cmd.vehicle_type, Some(VehicleTypeArg::Suv));
                assert!(cmd.window_minutes.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_nearby_defaults() {
        let cli = Cli::try_parse_from(vec!["fleetctl", "nearby"]).unwrap();
        match cli.command {
            Command::Nearby(cmd) => {
                assert!(cmd.lat.is_none());
                assert_eq!(cmd.format, OutputFormat::Table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_nearby_rejects_unknown_vehicle_type() {
        let args = vec!["fleetctl", "nearby", "--vehicle-type", "bicycle"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_db_reset() {
        let args = vec!["fleetctl", "db", "reset", "--with-samples", "--yes"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Db(DbCommand::Reset {
                with_samples: true,
                yes: true
            })
        ));
    }

    #[test]
    fn test_parse_stats_and_status() {
        let cli = Cli::try_parse_from(vec!["fleetctl", "stats", "--json"]).unwrap();
        assert!(cli.command.wants_json());

        let cli = Cli::try_parse_from(vec!["fleetctl", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
        assert!(!cli.command.wants_json());
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["fleetctl", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let args = vec!["fleetctl", "-v", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_parse_with_quiet() {
        let args = vec!["fleetctl", "-q", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.quiet);
    }
}
