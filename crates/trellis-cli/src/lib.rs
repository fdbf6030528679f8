//! Trellis CLI library
//!
//! This module contains the core CLI logic for the Trellis preprocessor.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, io, path::Path};

use log::{debug, info, warn};

use trellis::{Preprocessor, TrellisError};

use error_adapter::{DiagnosticAdapter, render};

/// Run the Trellis CLI application
///
/// This function expands the source document through the Trellis pipeline
/// and writes the result to the destination file.
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - A destination that exists when `--overwrite` was not given
/// - File I/O errors
/// - Configuration loading errors
/// - Expansion errors
/// - Output errors
pub fn run(args: &Args) -> Result<(), TrellisError> {
    info!(
        source_path = args.source,
        destination_path = args.destination;
        "Processing document"
    );

    let destination = Path::new(&args.destination);
    if destination.exists() && !args.overwrite {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "{} already exists, pass --overwrite to replace it",
                destination.display()
            ),
        )
        .into());
    }

    let app_config = config::load_config(args.config.as_ref())?;
    debug!(config:? = app_config; "Configuration loaded");

    let preprocessor = Preprocessor::new(app_config);
    let document = preprocessor.process_file(&args.source)?;
    for warning in document.warnings() {
        let report = DiagnosticAdapter::new(warning, document.sources());
        warn!("{}", render(&report));
    }
    let xml = preprocessor.render(&document)?;

    fs::write(destination, xml)?;

    info!(destination_file = args.destination; "Document written successfully");

    Ok(())
}
