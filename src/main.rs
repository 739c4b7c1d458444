//! Shortcut (Fenske-Underwood-Gilliland) distillation design helpers.
//!
//! K-values are interpolated from per-compound tables of (temperature, K) samples,
//! turned into relative volatilities against the heavy key and combined with the
//! material balance of the column.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod compound;
pub mod config;
pub mod error;
pub mod interpolation_table;
pub mod material_balance;
pub mod report;
pub mod temperature;
pub mod volatility;

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
