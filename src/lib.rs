//! # dicomweb-multipart
//!
//! Binary transport layer for DICOMweb retrieval: an endianness-aware,
//! growable byte stream and an extractor that slices the first payload out
//! of a `multipart/related` HTTP response body.
//!
//! The `run` function backs the command line tool shipped with the crate.

pub mod cli;
pub mod config;
pub mod error;
pub mod headers;
pub mod multipart;
pub mod numeric;
pub mod stream;

use crate::cli::Cli;
use crate::config::Config;
use clap::Parser;
use log::error;

/// Parses command-line arguments, initializes the logger and runs the
/// selected subcommand. Errors are logged and the process exits with 1.
pub fn run() {
    let cli = Cli::parse();

    // Load configuration with precedence: CLI > ENV > INI > Defaults
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let log_level = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::debug!("Log level set to: {log_level}");
    log::debug!("Using {config:?}");

    if let Err(e) = cli::execute(&cli, &config) {
        error!("{e}");
        std::process::exit(1);
    }
}
