//! aad - Command Line Front End for the Stochastic Adjoint AD Engine
//!
//! # Commands
//!
//! - `aad gradient` - Monte Carlo digital option delta under the discontinuity policies
//! - `aad check` - Print the effective engine configuration and run a self-test
//!
//! # Configuration
//!
//! Engine settings come from, in increasing precedence: defaults, a TOML file
//! (`--config`), `AAD_*` environment variables and the flags below.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

/// Stochastic adjoint AD engine CLI
#[derive(Parser)]
#[command(name = "aad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML format)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Discontinuity policy (zero, one, discrete-delta, regression-on-density,
    /// regression-on-distribution)
    #[arg(long, global = true)]
    policy: Option<String>,

    /// Window half-width in standard deviations of the trigger (`inf` allowed)
    #[arg(long, global = true)]
    window_width: Option<f64>,

    /// Degree of the density regression polynomial
    #[arg(long, global = true)]
    regression_degree: Option<usize>,

    /// Histogram buckets for the density regression
    #[arg(long, global = true)]
    density_buckets: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AAD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the delta of a digital call by Monte Carlo
    Gradient {
        /// Initial spot
        #[arg(long, default_value = "100")]
        spot: f64,

        /// Strike
        #[arg(long, default_value = "100")]
        strike: f64,

        /// Volatility
        #[arg(long, default_value = "0.2")]
        volatility: f64,

        /// Continuously compounded rate
        #[arg(long, default_value = "0.02")]
        rate: f64,

        /// Maturity in years
        #[arg(long, default_value = "1")]
        maturity: f64,

        /// Number of Monte Carlo paths
        #[arg(short, long, default_value = "100000")]
        num_paths: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Compare all discontinuity policies
        #[arg(long)]
        all_policies: bool,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Check engine configuration
    Check,
}

impl From<&Cli> for config::CliArgs {
    fn from(cli: &Cli) -> Self {
        config::CliArgs {
            config_file: cli.config.clone(),
            policy: cli.policy.clone(),
            window_width: cli.window_width,
            regression_degree: cli.regression_degree,
            density_buckets: cli.density_buckets,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    init_tracing(log_level);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let engine_config = config::build_config(&config::CliArgs::from(&cli))?;

    match cli.command {
        Commands::Gradient {
            spot,
            strike,
            volatility,
            rate,
            maturity,
            num_paths,
            seed,
            all_policies,
            format,
        } => {
            let option = commands::gradient::DigitalOption {
                spot,
                strike,
                volatility,
                rate,
                maturity,
            };
            commands::gradient::run(
                &option,
                num_paths,
                seed,
                &engine_config,
                all_policies,
                &format,
            )
        }
        Commands::Check => commands::check::run(&engine_config),
    }
}
