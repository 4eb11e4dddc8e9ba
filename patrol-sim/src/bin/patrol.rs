//! Patrol population simulation runner
//!
//! Usage:
//!   patrol -r <n> <m> <tau> <v> <vmax> <mu> <rho> <delta>
//!   patrol -f <infile>

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};
use patrol_sim::{Controller, CostRange, Observation, SimError, SimulationConfig};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "patrol")]
#[command(about = "Evolve a population of patrols policing planetary systems")]
#[command(group(ArgGroup::new("source").required(true).args(["random", "file"])))]
struct Args {
    /// Random costs: n m tau v vmax mu rho delta
    #[arg(
        short = 'r',
        num_args = 8,
        value_names = ["N", "M", "TAU", "V", "VMAX", "MU", "RHO", "DELTA"],
        allow_negative_numbers = true
    )]
    random: Option<Vec<String>>,

    /// Read parameters and the cost matrix from a file
    #[arg(short = 'f', value_name = "INFILE")]
    file: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of steps before the run stops
    #[arg(long, default_value_t = 1000)]
    max_steps: u64,

    /// Lowest random pacification time (inclusive)
    #[arg(long, default_value_t = 50)]
    cost_low: u32,

    /// Highest random pacification time (exclusive)
    #[arg(long, default_value_t = 350)]
    cost_high: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn load_config(args: &Args) -> Result<SimulationConfig, SimError> {
    match (&args.random, &args.file) {
        (Some(values), _) => SimulationConfig::from_values(values),
        (None, Some(path)) => SimulationConfig::from_file(path),
        (None, None) => Err(SimError::Usage("one of -r or -f is required".to_string())),
    }
}

fn print_observation(format: OutputFormat, observation: &Observation) {
    match format {
        OutputFormat::Json => match serde_json::to_string(observation) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("failed to serialize observation: {e}"),
        },
        OutputFormat::Text => print!("{observation}"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let range = match CostRange::new(args.cost_low, args.cost_high) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(
        seed,
        patrols = config.patrols,
        systems = config.systems,
        initial_population = config.initial_population,
        explicit_costs = config.costs.is_some(),
        "starting simulation"
    );

    let mut controller = match Controller::from_config(&config, args.max_steps, range, seed) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Failed to start simulation: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = controller.run(|observation| print_observation(args.format, observation));
    tracing::info!(
        ?state,
        steps = controller.world().current_step(),
        population = controller.world().population(),
        "simulation finished"
    );

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOM: [&str; 9] = ["-r", "10", "5", "100", "10", "50", "0.1", "0.5", "0.2"];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let argv = ["patrol"].iter().chain(RANDOM.iter()).chain(extra.iter()).copied();
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_format_defaults_to_text() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.max_steps, 1000);
    }

    #[test]
    fn test_format_accepts_json() {
        let args = parse(&["--format", "json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = parse(&["--format", "yaml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_source_is_required() {
        let err = Args::try_parse_from(["patrol", "--seed", "3"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
