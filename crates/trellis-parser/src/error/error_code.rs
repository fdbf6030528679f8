//! Error codes for the Trellis diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Loading and general errors
//! - `E1xx` - Symbol extraction errors
//! - `E2xx` - Use resolution errors
//! - `E3xx` - Repeat expansion errors
//! - `E4xx` - Definition and expression errors
//! - `E5xx` - Conditional errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Loading Errors (E0xx)
    // =========================================================================
    /// Resource not found.
    ///
    /// The start document or an imported file does not exist.
    E001,

    /// Malformed document.
    ///
    /// The markup could not be parsed: unbalanced tags, several root
    /// elements, bad escapes or an empty document.
    E002,

    /// Import cycle.
    ///
    /// A file imports itself, directly or through other files, or the
    /// import nesting exceeds the configured depth.
    E003,

    /// Missing required attribute.
    ///
    /// A construct lacks an attribute it cannot work without, e.g. an
    /// `<Import>` without `href`.
    E004,

    // =========================================================================
    // Symbol Errors (E1xx)
    // =========================================================================
    /// Missing symbol identifier.
    ///
    /// A `<Symbol>` has no `id` attribute.
    E100,

    /// Invalid removal.
    ///
    /// A `<Symbol>` or `<Define>` is the document root, or a `<Delete>`
    /// path selects the fragment itself. Neither has a parent to be
    /// detached from.
    E101,

    /// Duplicate symbol.
    ///
    /// Two `<Symbol>`s share an identifier and duplicates are configured
    /// as errors.
    E102,

    // =========================================================================
    // Use Errors (E2xx)
    // =========================================================================
    /// Unresolved symbol.
    ///
    /// A `<Use>` references an identifier no `<Symbol>` defines.
    E200,

    /// Empty delete target.
    ///
    /// A `<Delete>` path matches nothing in the symbol copy.
    E201,

    /// Empty transform target.
    ///
    /// A `<Transform>` path matches nothing in the symbol copy.
    E202,

    /// Invalid target path.
    ///
    /// The `href` of a `<Delete>` or `<Transform>` is not a valid element path.
    E203,

    /// Recursive use.
    ///
    /// A symbol uses itself, directly or through other symbols.
    E204,

    // =========================================================================
    // Repeat Errors (E3xx)
    // =========================================================================
    /// Missing `for` attribute on `<Repeat>`.
    E300,

    /// Missing `in` attribute on `<Repeat>`.
    E301,

    /// Value is not iterable.
    ///
    /// The `in` expression of a `<Repeat>` produced something that cannot be
    /// iterated, or an item that cannot be written as a literal.
    E302,

    /// Invalid loop variable.
    ///
    /// The `for` attribute of a `<Repeat>` is not an identifier.
    E303,

    // =========================================================================
    // Evaluation Errors (E4xx)
    // =========================================================================
    /// Definition error.
    ///
    /// The body of a `<Define>` failed to parse or execute.
    E400,

    /// Parent attribute not found.
    ///
    /// No ancestor carries the attribute named by `PARENT.name` or `PARENT`.
    E401,

    /// Self attribute not found.
    ///
    /// The element has no attribute named by `SELF.name`.
    E402,

    /// Mixed content.
    ///
    /// An expression producing markup shares its string with other content,
    /// or appears in an attribute.
    E403,

    /// Nested expression.
    ///
    /// An expression produced text that contains another expression.
    E404,

    /// Expression error.
    ///
    /// An inline `{expression}` failed to parse or evaluate.
    E405,

    // =========================================================================
    // Conditional Errors (E5xx)
    // =========================================================================
    /// Missing `condition` attribute on `<If>`.
    E500,

    /// Invalid condition.
    ///
    /// The condition is neither a boolean literal nor a valid expression.
    E501,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Loading errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            // Symbol errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            // Use errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            // Repeat errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            // Evaluation errors
            ErrorCode::E400 => "E400",
            ErrorCode::E401 => "E401",
            ErrorCode::E402 => "E402",
            ErrorCode::E403 => "E403",
            ErrorCode::E404 => "E404",
            ErrorCode::E405 => "E405",
            // Conditional errors
            ErrorCode::E500 => "E500",
            ErrorCode::E501 => "E501",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Loading errors
            ErrorCode::E001 => "resource not found",
            ErrorCode::E002 => "malformed document",
            ErrorCode::E003 => "import cycle",
            ErrorCode::E004 => "missing attribute",
            // Symbol errors
            ErrorCode::E100 => "missing symbol identifier",
            ErrorCode::E101 => "element without a parent cannot be removed",
            ErrorCode::E102 => "duplicate symbol",
            // Use errors
            ErrorCode::E200 => "unresolved symbol",
            ErrorCode::E201 => "nothing to delete",
            ErrorCode::E202 => "nothing to transform",
            ErrorCode::E203 => "invalid target path",
            ErrorCode::E204 => "recursive use",
            // Repeat errors
            ErrorCode::E300 => "missing `for` attribute",
            ErrorCode::E301 => "missing `in` attribute",
            ErrorCode::E302 => "value is not iterable",
            ErrorCode::E303 => "invalid loop variable",
            // Evaluation errors
            ErrorCode::E400 => "definition failed",
            ErrorCode::E401 => "parent attribute not found",
            ErrorCode::E402 => "self attribute not found",
            ErrorCode::E403 => "markup mixed with other content",
            ErrorCode::E404 => "nested expression",
            ErrorCode::E405 => "expression failed",
            // Conditional errors
            ErrorCode::E500 => "missing `condition` attribute",
            ErrorCode::E501 => "invalid condition",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
