//! Command-line argument definitions for the Trellis CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments name the source and destination documents,
//! select a configuration file and control logging verbosity.

use clap::Parser;

/// Command-line arguments for the Trellis preprocessor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the source document
    #[arg(help = "Path to the source document")]
    pub source: String,

    /// Path the expanded document is written to
    #[arg(help = "Path to write the expanded document to")]
    pub destination: String,

    /// Replace the destination if it already exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Shortcut for --log-level debug
    #[arg(short, long)]
    pub debug: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// The log level to run with, taking `--debug` into account.
    pub fn effective_log_level(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }
}
