//! Error types for Trellis operations.
//!
//! This module provides the main error type [`TrellisError`] which wraps
//! the error conditions that can occur while preprocessing a document.

use std::io;

use thiserror::Error;

use trellis_core::SourceMap;
use trellis_parser::Diagnostic;

/// The main error type for Trellis operations.
///
/// # Diagnostic Variants
///
/// The `Expand` variant carries the failing [`Diagnostic`] together with
/// every file read so far, so a reporter can show the source lines its
/// labels point at.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Expand { err: Diagnostic, sources: SourceMap },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl TrellisError {
    /// Create a new `Expand` error with the sources it refers to.
    pub fn new_expand_error(err: Diagnostic, sources: SourceMap) -> Self {
        Self::Expand { err, sources }
    }

    /// The diagnostic of an `Expand` error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Expand { err, .. } => Some(err),
            _ => None,
        }
    }
}
