mod catalog;
mod conjunction;
mod jobs;
mod propagation;
mod storage;
mod web;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use crate::catalog::{classify_object, parse_multi_tle, partition, OrbitalElement, TleFetcher};
use crate::conjunction::{format_utc_z, scan_catalog_concurrent, ScanReport};
use crate::jobs::{refresh_catalog, FetchOutcome};
use crate::propagation::Sgp4Oracle;
use crate::storage::Storage;
use crate::web::Config;

#[derive(Parser)]
#[command(name = "conjunction-watch")]
#[command(about = "Orbital close-approach screening")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and background jobs
    Serve {
        #[arg(short, long)]
        config: String,
    },
    /// Run a one-shot close-approach scan and print the closest events
    Scan {
        #[arg(short, long)]
        config: Option<String>,
        /// TLE files to scan instead of the stored catalog
        #[arg(long = "tle")]
        tle_files: Vec<String>,
        /// Grid start (RFC3339), defaults to now
        #[arg(long)]
        start: Option<String>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Fetch TLEs into the stored catalog
    Fetch {
        #[arg(short, long)]
        config: String,
        /// Ignore the minimum refresh interval
        #[arg(long)]
        force: bool,
    },
    /// Validate a configuration file
    ValidateConfig {
        #[arg(short, long)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Scan {
            config,
            tle_files,
            start,
            top,
        } => scan(config.as_deref(), &tle_files, start.as_deref(), top).await,
        Commands::Fetch { config, force } => fetch(&config, force).await,
        Commands::ValidateConfig { config } => validate_config(&config),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Config error: {}", e);
            None
        }
    }
}

async fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_tle_files(paths: &[String]) -> Option<(Vec<OrbitalElement>, Vec<OrbitalElement>)> {
    let mut tracked = Vec::new();
    let mut hazards = Vec::new();
    for path in paths {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                return None;
            }
        };
        for element in parse_multi_tle(&content) {
            if classify_object(&element.name).is_hazard() {
                hazards.push(element);
            } else {
                tracked.push(element);
            }
        }
    }
    Some((tracked, hazards))
}

async fn scan(
    config_path: Option<&str>,
    tle_files: &[String],
    start: Option<&str>,
    top: usize,
) -> ExitCode {
    let config = match config_path {
        Some(path) => match load_config(path) {
            Some(c) => Some(c),
            None => return ExitCode::FAILURE,
        },
        None => None,
    };

    let start_time = match start.map(DateTime::parse_from_rfc3339).transpose() {
        Ok(t) => t.map(|t| t.with_timezone(&Utc)),
        Err(e) => {
            eprintln!("Invalid --start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (tracked, hazards) = if !tle_files.is_empty() {
        match read_tle_files(tle_files) {
            Some(split) => split,
            None => return ExitCode::FAILURE,
        }
    } else if let Some(config) = &config {
        match Storage::new(config.storage.base_folder.clone()).catalog() {
            Ok(catalog) => partition(&catalog),
            Err(e) => {
                eprintln!("Storage error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        eprintln!("Nothing to scan: pass --tle files or --config with a stored catalog");
        return ExitCode::FAILURE;
    };

    let scan_config = config.as_ref().map(|c| c.scan.clone()).unwrap_or_default();
    let propagation = config.as_ref().map(|c| c.propagation).unwrap_or_default();

    let report = match scan_catalog_concurrent(
        Arc::new(Sgp4Oracle::new(propagation)),
        tracked,
        hazards,
        scan_config.options,
        scan_config.fan_out(),
        start_time,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print_report(&report, top);
    ExitCode::SUCCESS
}

fn print_report(report: &ScanReport, top: usize) {
    println!(
        "Scan {}: {} pairs, {} steps from {}, {} events{}",
        report.scan_id,
        report.pairs_scanned,
        report.grid_steps,
        report.grid_start,
        report.events.len(),
        if report.complete { "" } else { " (incomplete)" }
    );
    for (i, event) in report.closest(top).into_iter().enumerate() {
        println!(
            "  {}: {:>10.3} km  {}  {} <-> {}",
            i + 1,
            event.distance_km,
            format_utc_z(&event.time),
            event.object_a,
            event.object_b
        );
    }
    for failure in &report.failures {
        match &failure.counterpart {
            Some(other) => {
                eprintln!("  skipped {} / {}: {}", failure.object, other, failure.reason)
            }
            None => eprintln!("  skipped {}: {}", failure.object, failure.reason),
        }
    }
}

async fn fetch(path: &str, force: bool) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let fetch = &config.catalog.fetch;
    let storage = Storage::new(config.storage.base_folder.clone());
    let fetcher = TleFetcher::new(fetch.active.clone(), fetch.debris_sources.clone());

    match refresh_catalog(&storage, &fetcher, fetch.min_refresh_interval, force).await {
        Ok(FetchOutcome::Skipped { last_fetched_at }) => {
            println!("Catalog is fresh (last fetch {}), use --force to refetch", last_fetched_at);
            ExitCode::SUCCESS
        }
        Ok(FetchOutcome::Fetched(summary)) => {
            println!(
                "Catalog updated: {} new, {} updated",
                summary.inserted, summary.updated
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fetch failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate_config(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let scan = &config.scan.options;
    println!("Config is valid");
    println!("  bind: {}", config.web.bind);
    println!("  storage: {}", config.storage.base_folder.display());
    println!(
        "  scan: {}h every {} min, threshold {} km ({:?})",
        scan.duration_hours, scan.interval_minutes, scan.threshold_km, scan.threshold_mode
    );
    println!(
        "  jobs: TLE every {}, CDM every {}, collision scan {}",
        humantime::format_duration(config.jobs.tle_fetch_every),
        humantime::format_duration(config.jobs.cdm_scan_every),
        config
            .jobs
            .collision_scan_every
            .map(|d| format!("every {}", humantime::format_duration(d)))
            .unwrap_or_else(|| "on demand".to_string())
    );
    ExitCode::SUCCESS
}
