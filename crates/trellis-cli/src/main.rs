//! Trellis CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use trellis_cli::{
    Args,
    error_adapter::{render, to_reportable},
};

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let requested = args.effective_log_level();
    let log_level = LevelFilter::from_str(requested).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {requested}. Using 'warn' instead.");
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Trellis");
    debug!(args:?; "Parsed arguments");

    if let Err(err) = trellis_cli::run(&args) {
        error!("{}", render(&to_reportable(&err)));

        process::exit(1);
    }

    info!("Completed successfully");
}
