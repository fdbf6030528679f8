//! The core diagnostic type for the Trellis error system.
//!
//! A [`Diagnostic`] represents a single error or warning with optional
//! error code, labeled source locations, and help text.

use std::fmt;

use trellis_core::Origin;

use crate::error::{Severity, error_code::ErrorCode, label::Label};

/// A rich diagnostic message with source location information.
///
/// Diagnostics provide detailed information about errors and warnings,
/// including:
/// - A severity level
/// - An optional error code for documentation and searchability
/// - A primary message describing the issue
/// - One or more labeled source locations
/// - Optional help text with suggestions
///
/// # Example
///
/// ```text
/// error[E200]: cannot find symbol `box`
///   --> main.xml:12:5
///    |
/// 12 |     <Use href="#box"/>
///    |     ^^^^^^^^^^^^^^^^^^ referenced here
///    |
///    = help: define it with <Symbol id="box">
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use trellis_parser::error::{Diagnostic, ErrorCode};
    ///
    /// let diag = Diagnostic::error("cannot find symbol `box`")
    ///     .with_code(ErrorCode::E200)
    ///     .with_label(None, "referenced here")
    ///     .with_help("define it with <Symbol id=\"box\">");
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get all labels attached to this diagnostic.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Location of the first primary label that has one.
    pub fn primary_origin(&self) -> Option<Origin> {
        self.labels
            .iter()
            .filter(|label| label.is_primary())
            .find_map(Label::origin)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(
        mut self,
        origin: impl Into<Option<Origin>>,
        message: impl Into<String>,
    ) -> Self {
        self.labels.push(Label::primary(origin.into(), message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(
        mut self,
        origin: impl Into<Option<Origin>>,
        message: impl Into<String>,
    ) -> Self {
        self.labels.push(Label::secondary(origin.into(), message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Create a new diagnostic with the given severity and message.
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E001]: message" or "error: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use trellis_core::{SourceMap, Span};

    use super::*;

    fn origin(line: usize) -> Origin {
        let mut sources = SourceMap::new();
        let file = sources.add("main.xml", "<Root/>");
        Origin::new(file, Span::new(line * 10..line * 10 + 5), line)
    }

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert!(!diag.severity().is_warning());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.labels().is_empty());
        assert!(diag.help().is_none());
        assert!(diag.primary_origin().is_none());
    }

    #[test]
    fn test_diagnostic_with_code() {
        let diag = Diagnostic::error("unknown symbol").with_code(ErrorCode::E200);

        assert_eq!(diag.code(), Some(ErrorCode::E200));
    }

    #[test]
    fn test_diagnostic_labels() {
        let diag = Diagnostic::error("duplicate symbol")
            .with_secondary_label(origin(1), "first defined here")
            .with_label(None, "generated")
            .with_label(origin(4), "duplicate here");

        assert_eq!(diag.labels().len(), 3);
        assert!(diag.labels()[0].is_secondary());
        assert!(diag.labels()[1].is_primary());
        assert_eq!(diag.primary_origin().map(|o| o.line()), Some(4));
    }

    #[test]
    fn test_diagnostic_with_help() {
        let diag = Diagnostic::warning("ignored child").with_help("move it out of the <Use>");

        assert!(diag.severity().is_warning());
        assert_eq!(diag.help(), Some("move it out of the <Use>"));
    }

    #[test]
    fn test_diagnostic_display_with_code() {
        let diag = Diagnostic::error("cannot find symbol `box`").with_code(ErrorCode::E200);

        assert_eq!(diag.to_string(), "error[E200]: cannot find symbol `box`");
    }

    #[test]
    fn test_diagnostic_display_without_code() {
        let diag = Diagnostic::warning("symbol `a` redefined");

        assert_eq!(diag.to_string(), "warning: symbol `a` redefined");
    }
}
