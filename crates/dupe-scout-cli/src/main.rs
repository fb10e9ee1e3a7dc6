mod commands;
mod logging;
mod progress;
mod report;

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use commands::{Cli, Commands};
use dotenv::dotenv;
use dupe_scout_core::{config, DupeFinder, Error, FinderConfig};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan {
            root,
            cpu_cores,
            filter_by_filename,
            json,
        }) => {
            let mut effective = config;
            if cpu_cores != 0 {
                effective.cpu_cores = cpu_cores;
            }
            if filter_by_filename {
                effective.filter_by_filename = true;
            }

            if let Err(err) = run_scan(effective, &root, json) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }
}

fn run_scan(
    config: FinderConfig,
    root: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let finder = DupeFinder::new(config);

    let cancel = finder.cancel_flag();
    ctrlc::set_handler(move || {
        eprintln!("Interrupted, stopping scan...");
        cancel.cancel();
    })?;

    let reporter = CliReporter::new();
    let start = Instant::now();

    let outcome = match finder.run(root, &reporter) {
        Ok(outcome) => outcome,
        Err(Error::Cancelled) => {
            info!("Scan cancelled");
            process::exit(130);
        }
        Err(err) => return Err(err.into()),
    };

    let report = report::build_report(&outcome);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_human(&report);
    }

    info!("Completed in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
