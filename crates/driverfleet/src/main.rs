//! `fleetctl` - CLI for driverfleet
//!
//! This binary runs the trip pipeline and answers nearby-driver queries
//! against the resulting database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use chrono::{Duration, Utc};
use clap::Parser;

use driverfleet::cli::{
    Cli, Command, ConfigCommand, DbCommand, NearbyCommand, OutputFormat, ProcessCommand,
};
use driverfleet::pipeline::{last_summary, Pipeline};
use driverfleet::query::{find_nearby, NearbyDriver, NearbyQuery};
use driverfleet::{init_logging, Config, Error, Result, Storage};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let json = cli.command.wants_json();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Process(cmd) => handle_process(config, &cmd),
        Command::Nearby(cmd) => handle_nearby(&config, &cmd),
        Command::Stats(cmd) => handle_stats(&config, cmd.json),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Db(cmd) => handle_db(&config, cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn report_error(err: &Error, json: bool) {
    if json {
        let envelope = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "kind": err.kind(),
        });
        println!("{envelope}");
    } else {
        eprintln!("Error: {err}");
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_process(mut config: Config, cmd: &ProcessCommand) -> Result<()> {
    if cmd.seed.is_some() {
        config.pipeline.seed = cmd.seed;
    }
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.pipeline.input_path.clone());

    let mut storage = Storage::open(config.database_path())?;
    let summary = Pipeline::new(config).run(&input, &mut storage)?;

    if cmd.json {
        print_json(&serde_json::json!({
            "success": true,
            "summary": summary,
        }))?;
    } else {
        println!("Pipeline complete");
        println!("-----------------");
        println!("Input:            {}", summary.input_path.display());
        println!("Records read:     {}", summary.records_in);
        println!("After cleaning:   {}", summary.records_after_cleaning);
        println!("Drivers created:  {}", summary.profiles_created);
        println!("Input digest:     {}", summary.input_digest);
        if let Some(seed) = summary.seed {
            println!("Seed:             {seed}");
        }
    }
    Ok(())
}

fn handle_nearby(config: &Config, cmd: &NearbyCommand) -> Result<()> {
    let window = cmd
        .window_minutes
        .map_or_else(|| config.recency_window(), |m| Duration::minutes(i64::from(m)));
    let query = NearbyQuery::new(
        cmd.lat.unwrap_or(config.query.default_lat),
        cmd.lng.unwrap_or(config.query.default_lng),
        cmd.radius.unwrap_or(config.query.radius_km),
        window,
        cmd.vehicle_type.map(Into::into),
    )?;

    let storage = Storage::open_for_read(config.database_path())?;
    let drivers = find_nearby(&storage, &query, Utc::now())?;

    match cmd.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "success": true,
            "center": query.center,
            "radius_km": query.radius_km,
            "count": drivers.len(),
            "drivers": drivers,
        }))?,
        OutputFormat::Table => print_driver_table(&drivers),
        OutputFormat::Plain => {
            for driver in &drivers {
                let profile = &driver.record.profile;
                println!(
                    "{} {} ({}) {:.2} km, ETA {} min, {}",
                    profile.driver_id,
                    profile.name,
                    profile.vehicle_type.display_name(),
                    driver.distance_km,
                    driver.record.position.eta_minutes,
                    driver.record.position.status()
                );
            }
        }
    }
    Ok(())
}

fn print_driver_table(drivers: &[NearbyDriver]) {
    if drivers.is_empty() {
        println!("No drivers found nearby.");
        return;
    }

    println!(
        "{:<14} {:<20} {:<18} {:>9} {:>5} {:>6}  {}",
        "ID", "NAME", "VEHICLE", "DIST (km)", "ETA", "RATING", "STATUS"
    );
    for driver in drivers {
        let profile = &driver.record.profile;
        let position = &driver.record.position;
        println!(
            "{:<14} {:<20} {:<18} {:>9.2} {:>5} {:>6.1}  {}",
            profile.driver_id,
            profile.name,
            profile.vehicle_type.display_name(),
            driver.distance_km,
            position.eta_minutes,
            profile.rating,
            position.status()
        );
    }
    println!();
    println!("{} drivers", drivers.len());
}

fn handle_stats(config: &Config, json: bool) -> Result<()> {
    let storage = Storage::open_for_read(config.database_path())?;
    let stats = storage
        .fleet_stats(Utc::now() - config.recency_window())
        .map_err(Error::into_store_read)?;

    if json {
        print_json(&serde_json::json!({
            "success": true,
            "stats": stats,
        }))?;
    } else {
        println!("Fleet statistics");
        println!("----------------");
        println!("Total drivers:      {}", stats.total_drivers);
        println!("Available drivers:  {}", stats.available_drivers);
        println!("Average ETA (min):  {:.1}", stats.avg_eta_minutes);
        println!("Coverage:           {:.1}%", stats.coverage_percentage);
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = Storage::open_for_read(config.database_path())?;
    let status = storage.data_status().map_err(Error::into_store_read)?;
    let last_run = last_summary(&storage).map_err(Error::into_store_read)?;

    if json {
        print_json(&serde_json::json!({
            "success": true,
            "database_path": storage.path(),
            "drivers_in_db": status.drivers,
            "positions_in_db": status.positions,
            "has_data": status.has_data,
            "last_run": last_run,
        }))?;
    } else {
        println!("fleetctl status");
        println!("---------------");
        println!("Database:      {}", storage.path().display());
        println!("Drivers:       {}", status.drivers);
        println!("Positions:     {}", status.positions);
        match last_run {
            Some(run) => {
                println!(
                    "Last run:      {} ({} drivers from {})",
                    run.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    run.profiles_created,
                    run.input_path.display()
                );
                println!("Input digest:  {}", run.input_digest);
            }
            None => println!("Last run:      never"),
        }
        if !status.has_data {
            println!();
            println!("No drivers yet. Run `fleetctl process` to build them from a trip feed.");
        }
    }
    Ok(())
}

fn handle_db(config: &Config, cmd: DbCommand) -> Result<()> {
    match cmd {
        DbCommand::Reset { with_samples, yes } => {
            if !yes {
                println!(
                    "This will delete every driver and position in {}.",
                    config.database_path().display()
                );
                println!("Use --yes to confirm.");
                return Ok(());
            }

            let mut storage = Storage::open(config.database_path())?;
            let removed = storage.clear()?;
            println!("Removed {removed} drivers.");

            if with_samples {
                let seeded = storage.seed_samples(Utc::now())?;
                println!("Inserted {seeded} sample drivers.");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Pipeline]");
                println!("  Input path:         {}", config.pipeline.input_path.display());
                println!("  Origin column:      {}", config.pipeline.origin_column);
                println!("  Max profiles:       {}", config.pipeline.max_profiles);
                println!("  Min group size:     {}", config.pipeline.min_group_size);
                println!(
                    "  Seed:               {}",
                    config
                        .pipeline
                        .seed
                        .map_or_else(|| "random".to_string(), |s| s.to_string())
                );
                println!();
                println!("[Cleaning]");
                let bounds = &config.cleaning.bounds;
                println!(
                    "  Bounds:             lat [{}, {}], lng [{}, {}]",
                    bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng
                );
                println!(
                    "  Duration (s):       ({}, {})",
                    config.cleaning.min_duration_secs, config.cleaning.max_duration_secs
                );
                println!("  Outlier sigma:      {}", config.cleaning.outlier_sigma);
                println!();
                println!("[Query]");
                println!(
                    "  Default center:     {}, {}",
                    config.query.default_lat, config.query.default_lng
                );
                println!("  Radius (km):        {}", config.query.radius_km);
                println!("  Recency (min):      {}", config.query.recency_minutes);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
