//! SIRV simulator CLI
//!
//! Runs one stochastic SIRV epidemic and prints how many individuals were infected per class.
//!
//! # Example
//!
//! ```bash
//! # The built-in reference scenario
//! sirv --seed 7
//!
//! # A scenario from a parameter file, with per-event tracing
//! sirv --config scenario.json --log-level trace
//!
//! # Write the reference scenario out as a starting point for a parameter file
//! sirv --print-config > scenario.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ixa_sirv::{
    Parameters, PopulationClass, SimulationResult, SirvError,
    log::{LevelFilter, enable_logging, error},
    simulate,
};

/// SIRV epidemic simulator
///
/// Single-threaded and reproducible: the same seed and parameters give the same run.
#[derive(Parser, Debug)]
#[command(name = "sirv")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON parameter file. When omitted, the built-in reference scenario is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the random number stream
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Overrides the time horizon of the parameters
    #[arg(short = 't', long)]
    time_horizon: Option<f64>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the parameters as JSON and exit without simulating
    #[arg(long)]
    print_config: bool,
}

fn load_parameters(args: &Args) -> Result<Parameters, SirvError> {
    let mut parameters = match &args.config {
        Some(path) => Parameters::load(path)?,
        None => Parameters::default(),
    };
    if let Some(time_horizon) = args.time_horizon {
        parameters.time_horizon = time_horizon;
        parameters.validate()?;
    }
    Ok(parameters)
}

fn print_summary(result: &SimulationResult) {
    println!(
        "Total amount of entities that got infected across simulation: {}",
        result.total_ever_infected()
    );
    for class in PopulationClass::ALL {
        println!(
            "Amount of {class} entities that got infected across simulation: {}",
            result.ever_infected[class.index()]
        );
    }
    println!("Entities vaccinated while susceptible: {}", result.total_vaccinated());
    println!(
        "Ended at t = {:.6} after {} events ({:?})",
        result.final_time, result.event_count, result.termination
    );
}

fn run(args: &Args) -> Result<(), SirvError> {
    enable_logging(args.log_level)?;
    let parameters = load_parameters(args)?;

    if args.print_config {
        println!("{}", parameters.to_json_string()?);
        return Ok(());
    }

    let result = simulate(parameters, args.seed)?;
    print_summary(&result);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("sirv: {err}");
            ExitCode::FAILURE
        }
    }
}
