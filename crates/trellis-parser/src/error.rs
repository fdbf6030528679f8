//! Error and diagnostic system for the Trellis preprocessor.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - Primary and secondary labels pointing at source elements
//! - Severity levels
//!
//! # Overview
//!
//! The error system is built around the [`Diagnostic`] type, which represents
//! a single error or warning message with an optional error code, labelled
//! source locations, and help text. Every preprocessing phase returns
//! [`Result`], and the first error aborts the run.
//!
//! # Example
//!
//! ```
//! # use trellis_parser::error::{Diagnostic, ErrorCode};
//! # use trellis_core::{Origin, SourceMap, Span};
//!
//! let mut sources = SourceMap::new();
//! let file = sources.add("main.xml", "<Root/>");
//! let here = Origin::new(file, Span::new(40..60), 3);
//! let first = Origin::new(file, Span::new(10..30), 1);
//!
//! let diag = Diagnostic::error("symbol `box` is defined multiple times")
//!     .with_code(ErrorCode::E102)
//!     .with_label(here, "duplicate definition")
//!     .with_secondary_label(first, "first defined here")
//!     .with_help("rename one of the symbols");
//! ```

mod diagnostic;
mod error_code;
mod label;
mod severity;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use severity::Severity;

/// A type alias for `Result<T, Diagnostic>`.
pub type Result<T> = std::result::Result<T, Diagnostic>;
